use crate::error::ScrapeError;
use crate::model::{PanelRecord, ThemeMembership};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Organizer,
    Keyword,
    Theme,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Organizer, Family::Keyword, Family::Theme];

    pub fn name(self) -> &'static str {
        match self {
            Family::Organizer => "organizer",
            Family::Keyword => "keyword",
            Family::Theme => "theme",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideRow {
    pub id: String,
    pub title: String,
    pub organizers: Vec<Option<String>>,
    pub posted: String,
    pub description: String,
    pub keywords: Vec<Option<String>>,
    pub themes: Vec<Option<String>>,
    pub has_unseparated_suffix: bool,
}

impl WideRow {
    pub fn slots(&self, family: Family) -> &[Option<String>] {
        match family {
            Family::Organizer => &self.organizers,
            Family::Keyword => &self.keywords,
            Family::Theme => &self.themes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideDataset {
    pub organizer_width: usize,
    pub keyword_width: usize,
    pub theme_width: usize,
    pub rows: Vec<WideRow>,
}

impl WideDataset {
    pub fn width(&self, family: Family) -> usize {
        match family {
            Family::Organizer => self.organizer_width,
            Family::Keyword => self.keyword_width,
            Family::Theme => self.theme_width,
        }
    }

    pub fn columns(&self) -> Vec<String> {
        let numbered = |family: Family| {
            (1..=self.width(family))
                .map(move |i| format!("{}_{i}", family.name()))
                .collect::<Vec<_>>()
        };

        let mut columns = vec!["id".to_string(), "title".to_string()];
        columns.extend(numbered(Family::Organizer));
        columns.push("posted".to_string());
        columns.push("description".to_string());
        columns.extend(numbered(Family::Keyword));
        columns.extend(numbered(Family::Theme));
        columns.push("has_unseparated_suffix".to_string());
        columns
    }

    pub fn check_widths(&self) -> Result<(), ScrapeError> {
        for row in &self.rows {
            for family in Family::ALL {
                let found = row.slots(family).len();
                let expected = self.width(family);
                if found != expected {
                    return Err(ScrapeError::SchemaWidth {
                        family: family.name(),
                        id: row.id.clone(),
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyEntry {
    pub id: String,
    pub order: usize,
    pub value: String,
}

pub const LONG_COLUMNS: [&str; 11] = [
    "id",
    "title",
    "organizer_order",
    "organizer",
    "keyword_order",
    "keyword",
    "theme_order",
    "theme",
    "description",
    "posted",
    "has_unseparated_suffix",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRow {
    pub id: String,
    pub title: String,
    pub organizer_order: Option<usize>,
    pub organizer: Option<String>,
    pub keyword_order: Option<usize>,
    pub keyword: Option<String>,
    pub theme_order: Option<usize>,
    pub theme: Option<String>,
    pub description: String,
    pub posted: String,
    pub has_unseparated_suffix: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongDataset {
    pub rows: Vec<LongRow>,
}

pub fn build_wide(records: &[PanelRecord], themes: &ThemeMembership) -> WideDataset {
    let joined: Vec<(&PanelRecord, Vec<String>)> = records
        .iter()
        .map(|record| {
            let mut labels = record.themes.clone();
            for label in themes.get(&record.id).into_iter().flatten() {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
            (record, labels)
        })
        .collect();

    let organizer_width = joined
        .iter()
        .map(|(r, _)| r.organizers.len())
        .max()
        .unwrap_or(0);
    let keyword_width = joined
        .iter()
        .map(|(r, _)| r.keywords.len())
        .max()
        .unwrap_or(0);
    let theme_width = joined.iter().map(|(_, t)| t.len()).max().unwrap_or(0);

    let rows = joined
        .into_iter()
        .map(|(record, labels)| WideRow {
            id: record.id.clone(),
            title: record.title.clone(),
            organizers: pad(record.organizers.iter().cloned(), organizer_width),
            posted: record.posted.clone(),
            description: record.description.clone(),
            keywords: pad(record.keywords.iter().cloned(), keyword_width),
            themes: pad(labels.into_iter(), theme_width),
            has_unseparated_suffix: record.has_unseparated_suffix,
        })
        .collect();

    WideDataset {
        organizer_width,
        keyword_width,
        theme_width,
        rows,
    }
}

fn pad(values: impl Iterator<Item = String>, width: usize) -> Vec<Option<String>> {
    let mut slots: Vec<Option<String>> = values.map(Some).collect();
    slots.resize(width.max(slots.len()), None);
    slots
}

pub fn unpivot_family(wide: &WideDataset, family: Family) -> Vec<FamilyEntry> {
    wide.rows
        .iter()
        .flat_map(|row| {
            row.slots(family)
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| {
                    slot.as_ref().map(|value| FamilyEntry {
                        id: row.id.clone(),
                        order: index + 1,
                        value: value.clone(),
                    })
                })
        })
        .collect()
}

/// Cross-expands the three unpivoted families per id.
///
/// A family with no values contributes one null slot, so every wide row yields
/// at least one long row.
pub fn to_long(wide: &WideDataset) -> LongDataset {
    let unpivoted: Vec<(Family, Vec<FamilyEntry>)> = Family::ALL
        .into_iter()
        .map(|family| (family, unpivot_family(wide, family)))
        .collect();
    let mut by_family: HashMap<Family, HashMap<&str, Vec<(usize, &str)>>> = HashMap::new();
    for (family, entries) in &unpivoted {
        let grouped = by_family.entry(*family).or_default();
        for entry in entries {
            grouped
                .entry(entry.id.as_str())
                .or_default()
                .push((entry.order, entry.value.as_str()));
        }
    }

    let slots_for = |family: Family, id: &str| -> Vec<Option<(usize, String)>> {
        let mut values = by_family
            .get(&family)
            .and_then(|grouped| grouped.get(id))
            .cloned()
            .unwrap_or_default();
        values.sort_by_key(|(order, _)| *order);
        if values.is_empty() {
            vec![None]
        } else {
            values
                .into_iter()
                .map(|(order, value)| Some((order, value.to_string())))
                .collect()
        }
    };

    let mut rows = Vec::new();
    for row in &wide.rows {
        let organizers = slots_for(Family::Organizer, &row.id);
        let keywords = slots_for(Family::Keyword, &row.id);
        let themes = slots_for(Family::Theme, &row.id);

        for organizer in &organizers {
            for keyword in &keywords {
                for theme in &themes {
                    rows.push(LongRow {
                        id: row.id.clone(),
                        title: row.title.clone(),
                        organizer_order: organizer.as_ref().map(|(o, _)| *o),
                        organizer: organizer.as_ref().map(|(_, v)| v.clone()),
                        keyword_order: keyword.as_ref().map(|(o, _)| *o),
                        keyword: keyword.as_ref().map(|(_, v)| v.clone()),
                        theme_order: theme.as_ref().map(|(o, _)| *o),
                        theme: theme.as_ref().map(|(_, v)| v.clone()),
                        description: row.description.clone(),
                        posted: row.posted.clone(),
                        has_unseparated_suffix: row.has_unseparated_suffix,
                    });
                }
            }
        }
    }

    LongDataset { rows }
}

#[derive(Default)]
struct RecordAccumulator {
    title: String,
    posted: String,
    description: String,
    has_unseparated_suffix: bool,
    organizers: BTreeMap<usize, String>,
    keywords: BTreeMap<usize, String>,
    themes: BTreeMap<usize, String>,
}

pub fn from_long(long: &LongDataset) -> (Vec<PanelRecord>, ThemeMembership) {
    let mut order: Vec<String> = Vec::new();
    let mut accumulators: HashMap<String, RecordAccumulator> = HashMap::new();

    for row in &long.rows {
        let acc = accumulators.entry(row.id.clone()).or_insert_with(|| {
            order.push(row.id.clone());
            RecordAccumulator {
                title: row.title.clone(),
                posted: row.posted.clone(),
                description: row.description.clone(),
                has_unseparated_suffix: row.has_unseparated_suffix,
                ..RecordAccumulator::default()
            }
        });
        if let (Some(o), Some(v)) = (row.organizer_order, &row.organizer) {
            acc.organizers.entry(o).or_insert_with(|| v.clone());
        }
        if let (Some(o), Some(v)) = (row.keyword_order, &row.keyword) {
            acc.keywords.entry(o).or_insert_with(|| v.clone());
        }
        if let (Some(o), Some(v)) = (row.theme_order, &row.theme) {
            acc.themes.entry(o).or_insert_with(|| v.clone());
        }
    }

    let mut records = Vec::with_capacity(order.len());
    let mut membership = ThemeMembership::new();
    for id in order {
        let Some(acc) = accumulators.remove(&id) else {
            continue;
        };
        let themes: Vec<String> = acc.themes.into_values().collect();
        if !themes.is_empty() {
            membership.insert(id.clone(), themes.clone());
        }
        records.push(PanelRecord {
            id,
            title: acc.title,
            organizers: acc.organizers.into_values().collect(),
            posted: acc.posted,
            description: acc.description,
            keywords: acc.keywords.into_values().collect(),
            themes,
            has_unseparated_suffix: acc.has_unseparated_suffix,
        });
    }

    (records, membership)
}

pub fn pivot_wide(long: &LongDataset) -> WideDataset {
    let (records, membership) = from_long(long);
    build_wide(&records, &membership)
}
