use anyhow::Result;
use panelcorpus::config::{ListingConfig, ThemeConfig};
use panelcorpus::error::ScrapeError;
use panelcorpus::extract::parse_document;
use panelcorpus::listing::{
    ListingSelectors, harvest_listing, parse_numbered_title, strip_numeric_prefix,
};
use panelcorpus::model::ThemeMember;
use panelcorpus::themes::{
    ThemeSelectors, build_theme_membership, harvest_theme_members, harvest_themes,
};

const PAGE_URL: &str = "https://panels.example.org/";

fn listing_config() -> Result<ListingConfig> {
    let config: ListingConfig = toml::from_str(
        r#"
start_url = "https://panels.example.org/"
next_selector = "a.older"
"#,
    )?;
    Ok(config)
}

fn theme_config() -> Result<ThemeConfig> {
    let config: ThemeConfig = toml::from_str(r#"menu_url = "https://panels.example.org/p/themes.html""#)?;
    Ok(config)
}

#[test]
fn numbered_titles_split_into_id_and_title() {
    assert_eq!(
        parse_numbered_title("042. Gender and Technology"),
        Some(("042".to_string(), "Gender and Technology".to_string()))
    );
    assert_eq!(
        parse_numbered_title("  7 - Urban\n  Commons "),
        Some(("7".to_string(), "Urban Commons".to_string()))
    );
    assert_eq!(
        parse_numbered_title("042 Gender and Technology"),
        Some(("042".to_string(), "Gender and Technology".to_string()))
    );
    assert_eq!(
        parse_numbered_title("12) Water: Politics"),
        Some(("12".to_string(), "Water: Politics".to_string()))
    );
    assert_eq!(parse_numbered_title("Call for Panels"), None);
    assert_eq!(parse_numbered_title("042"), None);
    assert_eq!(parse_numbered_title("42nd Session"), None);
}

#[test]
fn stripping_the_prefix_is_idempotent() {
    let once = strip_numeric_prefix("042. Gender and Technology");
    let twice = strip_numeric_prefix(&once);

    assert_eq!(once, "Gender and Technology");
    assert_eq!(twice, once);
    assert_eq!(strip_numeric_prefix("Call for Panels"), "Call for Panels");
}

#[test]
fn listing_pairs_titles_and_snippets_and_filters_links() -> Result<()> {
    let selectors = ListingSelectors::from_config(&listing_config()?)?;
    let doc = parse_document(
        r#"<html><body>
        <div class="blog-posts">
          <h3 class="post-title"><a href="/2019/05/042-gender.html">042. Gender and Technology</a></h3>
          <div class="post-body">First snippet</div>
          <a href="https://twitter.com/share?u=1">Tweet</a>
          <h3 class="post-title"><a href="https://panels.example.org/2019/05/043-data.html">043. Decolonizing Data</a></h3>
          <div class="post-body">Second   snippet</div>
          <a href="/p/about.html">About</a>
          <a href="/2019/05/042-gender.html">again</a>
          <h3 class="post-title">Call for Panels</h3>
          <div class="post-body">No id here</div>
        </div>
        <a href="/2018/01/outside.html">outside the container</a>
        <a class="older" href="/search?page=2">Older</a>
        </body></html>"#,
    );

    let page = harvest_listing(PAGE_URL, &doc, &selectors)?;

    let ids: Vec<&str> = page.summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["042", "043"]);
    assert_eq!(page.summaries[1].snippet, "Second snippet");
    assert_eq!(
        page.summaries[0].url.as_deref(),
        Some("https://panels.example.org/2019/05/042-gender.html")
    );
    assert_eq!(page.malformed, vec!["Call for Panels"]);
    assert_eq!(
        page.detail_urls,
        vec![
            "https://panels.example.org/2019/05/042-gender.html",
            "https://panels.example.org/2019/05/043-data.html",
        ]
    );
    assert_eq!(
        page.next_url.as_deref(),
        Some("https://panels.example.org/search?page=2")
    );
    Ok(())
}

#[test]
fn unequal_titles_and_snippets_fail_loudly() -> Result<()> {
    let selectors = ListingSelectors::from_config(&listing_config()?)?;
    let doc = parse_document(
        r#"<div class="blog-posts">
          <h3 class="post-title">042. One</h3><div class="post-body">a</div>
          <h3 class="post-title">043. Two</h3>
        </div>"#,
    );

    let err = harvest_listing(PAGE_URL, &doc, &selectors).expect_err("shape must be checked");
    assert_eq!(
        err,
        ScrapeError::ListingShape {
            url: PAGE_URL.to_string(),
            titles: 2,
            snippets: 1,
        }
    );
    Ok(())
}

#[test]
fn listing_output_is_deterministic() -> Result<()> {
    let selectors = ListingSelectors::from_config(&listing_config()?)?;
    let body = r#"<div class="blog-posts">
        <h3 class="post-title"><a href="/2019/1.html">1. A</a></h3><div class="post-body">a</div>
        <h3 class="post-title"><a href="/2019/2.html">2. B</a></h3><div class="post-body">b</div>
      </div>"#;

    let first = harvest_listing(PAGE_URL, &parse_document(body), &selectors)?;
    let second = harvest_listing(PAGE_URL, &parse_document(body), &selectors)?;
    assert_eq!(first.summaries, second.summaries);
    assert_eq!(first.detail_urls, second.detail_urls);
    Ok(())
}

#[test]
fn theme_menu_skips_blank_labels_and_duplicate_links() -> Result<()> {
    let selectors = ThemeSelectors::from_config(&theme_config()?)?;
    let doc = parse_document(
        r#"<div class="theme-menu">
          <a href="/search/label/Gender">Gender</a>
          <a href="/search/label/Data">Data</a>
          <a href="/search/label/Data">Data again</a>
          <a href="/search/label/Blank">  </a>
          <a>No link</a>
        </div>"#,
    );

    let links = harvest_themes("https://panels.example.org/p/themes.html", &doc, &selectors);
    let labels: Vec<&str> = links.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["Gender", "Data"]);
    assert_eq!(links[0].url, "https://panels.example.org/search/label/Gender");
    Ok(())
}

#[test]
fn theme_membership_deduplicates_pairs() -> Result<()> {
    let selectors = ThemeSelectors::from_config(&theme_config()?)?;
    let gender = harvest_theme_members(
        &parse_document(
            r#"<h3 class="post-title">042. Gender and Technology</h3>
               <h3 class="post-title">042. Gender and Technology</h3>
               <h3 class="post-title">Programme notes</h3>"#,
        ),
        "Gender",
        &selectors,
    );
    assert_eq!(gender.members.len(), 2);
    assert_eq!(gender.malformed, vec!["Programme notes"]);

    let mut rows = gender.members;
    rows.push(ThemeMember {
        id: "042".to_string(),
        title: "Gender and Technology".to_string(),
        theme: "Data".to_string(),
    });
    let membership = build_theme_membership(&rows);

    assert_eq!(membership["042"], vec!["Gender", "Data"]);
    Ok(())
}
