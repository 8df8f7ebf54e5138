//! Assembly of the fixed report template from enriched epics.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use epicreport_shared::{
    Content, EpicQuery, ReportModel, Section, SectionKind, Table, TableKind,
};

use crate::enrich::{EnrichedEpic, EnrichedReport};

/// Marker appended to the heading of blocked epics.
pub const BLOCKER_MARKER: &str = "⚠️";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

const CHILD_ITEM_COLUMNS: &[&str] = &["ID", "Title", "Type & State", "Assigned To"];
const NEW_EPIC_COLUMNS: &[&str] = &["Epic ID", "Title", "Assigned To"];

const STATIC_NOTES: &[&str] = &[
    "Filtering: Child items only shown for Active/Committed epics",
    "Enhanced Features: Last updated dates and salient points for active epics",
    "Row Protection: Child items table rows cannot break across pages",
    "Font: Aptos throughout document",
    "Icons: Only used for blockers/attention items (⚠️)",
];

/// Context for the header, summary and footer.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Project name shown in the title ("CloudInit").
    pub project_name: String,
    /// Human-readable data source.
    pub source: String,
    pub query: EpicQuery,
    pub generated_at: DateTime<Utc>,
}

impl ReportMeta {
    pub fn title(&self) -> String {
        format!("{} Epic Status Report", self.project_name)
    }
}

/// Build the report in its fixed section order.
#[instrument(skip_all, fields(project = %meta.project_name))]
pub fn build_report(enriched: &EnrichedReport, meta: &ReportMeta) -> ReportModel {
    let mut sections = vec![header(meta), executive_summary(enriched, meta)];
    active_committed(&mut sections, &enriched.active_committed);
    sections.push(new_epics(&enriched.new));
    sections.push(other_states(&enriched.other));
    sections.push(footer(enriched, meta));

    debug!(sections = sections.len(), "report model built");

    ReportModel {
        title: meta.title(),
        generated_at: meta.generated_at,
        sections,
    }
}

fn section(kind: SectionKind, level: u8, heading: impl Into<String>, content: Content) -> Section {
    Section {
        kind,
        level,
        heading: heading.into(),
        content,
    }
}

fn header(meta: &ReportMeta) -> Section {
    let line = format!(
        "Generated: {} | Source: {} | Area: {} | Iteration: {}",
        meta.generated_at.format(TIMESTAMP_FORMAT),
        meta.source,
        meta.query.area_path,
        meta.query.iteration_path,
    );
    section(SectionKind::Header, 1, meta.title(), Content::Prose(line))
}

fn executive_summary(enriched: &EnrichedReport, meta: &ReportMeta) -> Section {
    let counts = &enriched.counts;
    let mut text = format!(
        "This report covers {} {}-related epics from {}. Active work is distributed across {} \
         active/committed epics with detailed child items, while {} epics are in 'New' state \
         awaiting prioritization and planning.",
        counts.total, meta.project_name, meta.source, counts.active_committed, counts.new,
    );
    if counts.total == 0 {
        text.push_str(&format!(
            " No epics were found for area path '{}' and iteration path '{}'.",
            meta.query.area_path, meta.query.iteration_path
        ));
    }
    section(
        SectionKind::ExecutiveSummary,
        2,
        "Executive Summary",
        Content::Prose(text),
    )
}

fn active_committed(sections: &mut Vec<Section>, epics: &[EnrichedEpic]) {
    let intro = if epics.is_empty() {
        "No active or committed epics found.".to_string()
    } else {
        format!("{} epics are currently Active or Committed.", epics.len())
    };
    sections.push(section(
        SectionKind::ActiveCommitted,
        2,
        "Active & Committed Epics (Detailed View)",
        Content::Prose(intro),
    ));

    for (n, enriched) in epics.iter().enumerate() {
        let epic = &enriched.epic;

        let mut heading = format!("{}. {} (#{})", n + 1, epic.title, epic.id);
        if enriched.blocked {
            heading.push(' ');
            heading.push_str(BLOCKER_MARKER);
        }
        let details = format!(
            "State: {} | Assigned: {} | Last Updated: {}",
            epic.state,
            epic.assignee,
            enriched.last_updated.format("%Y-%m-%d"),
        );
        sections.push(section(SectionKind::EpicDetail, 3, heading, Content::Prose(details)));

        if !enriched.salient_points.is_empty() {
            let points = enriched
                .salient_points
                .iter()
                .map(|p| p.text.clone())
                .collect();
            sections.push(section(
                SectionKind::KeyUpdates,
                4,
                "Key Updates",
                Content::Bullets(points),
            ));
        }

        let children = if epic.children.is_empty() {
            Content::Prose("No child items currently assigned.".into())
        } else {
            let rows = epic
                .children
                .iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.title.clone(),
                        format!("{} - {}", c.work_item_type, c.state),
                        c.assignee.clone(),
                    ]
                })
                .collect();
            Content::Table(Table::new(TableKind::ChildItems, CHILD_ITEM_COLUMNS, rows))
        };
        sections.push(section(SectionKind::ChildItems, 4, "Child Items", children));
    }
}

fn new_epics(epics: &[EnrichedEpic]) -> Section {
    let content = if epics.is_empty() {
        Content::Prose("No new epics found.".into())
    } else {
        let rows = epics
            .iter()
            .map(|e| {
                vec![
                    e.epic.id.to_string(),
                    e.epic.title.clone(),
                    e.epic.assignee.clone(),
                ]
            })
            .collect();
        Content::Table(Table::new(TableKind::NewEpics, NEW_EPIC_COLUMNS, rows))
    };
    section(
        SectionKind::NewEpics,
        2,
        "New Epics (Awaiting Prioritization)",
        content,
    )
}

fn other_states(epics: &[EnrichedEpic]) -> Section {
    let content = if epics.is_empty() {
        Content::Prose("No epics in other states found.".into())
    } else {
        Content::Bullets(
            epics
                .iter()
                .map(|e| {
                    format!(
                        "{} (#{}) - State: {} - {}",
                        e.epic.title, e.epic.id, e.epic.state, e.epic.assignee
                    )
                })
                .collect(),
        )
    };
    section(SectionKind::OtherStates, 2, "Other Epic States", content)
}

fn footer(enriched: &EnrichedReport, meta: &ReportMeta) -> Section {
    let counts = &enriched.counts;
    let mut details = vec![
        format!("Total Epics Analyzed: {}", counts.total),
        format!("Active/Committed Epics: {}", counts.active_committed),
        format!("New Epics: {}", counts.new),
        format!("Other States: {}", counts.other),
        format!("Removed Epics Excluded: {}", counts.removed),
        format!("Total Child Items: {}", counts.child_items),
        format!(
            "Report Generation Time: {}",
            meta.generated_at.format(TIMESTAMP_FORMAT)
        ),
        format!("Data Source: {}", meta.source),
    ];
    details.extend(STATIC_NOTES.iter().map(|n| (*n).to_string()));

    section(SectionKind::Footer, 2, "Report Details", Content::Bullets(details))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;
    use epicreport_shared::{ChildItem, Epic, EpicState};

    use super::*;
    use crate::classify::classify;
    use crate::enrich::enrich;

    fn meta() -> ReportMeta {
        ReportMeta {
            project_name: "CloudInit".into(),
            source: "Azure DevOps (contoso/One)".into(),
            query: EpicQuery {
                project: "One".into(),
                area_path: "One\\CloudInit".into(),
                iteration_path: "One\\Bromine".into(),
            },
            generated_at: Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 0).unwrap(),
        }
    }

    fn epic(id: u64, state: &str, title: &str) -> Epic {
        Epic {
            id,
            title: title.into(),
            state: EpicState::parse(Some(state)),
            assignee: "Unassigned".into(),
            tags: BTreeSet::new(),
            last_updated: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            children: vec![],
        }
    }

    fn build(epics: Vec<Epic>) -> ReportModel {
        build_report(&enrich(classify(epics)), &meta())
    }

    fn kinds(model: &ReportModel) -> Vec<SectionKind> {
        model.sections.iter().map(|s| s.kind).collect()
    }

    fn prose(section: &Section) -> &str {
        match &section.content {
            Content::Prose(text) => text,
            other => panic!("expected prose, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_has_placeholders_and_zero_counts() {
        let model = build(vec![]);

        assert_eq!(
            kinds(&model),
            vec![
                SectionKind::Header,
                SectionKind::ExecutiveSummary,
                SectionKind::ActiveCommitted,
                SectionKind::NewEpics,
                SectionKind::OtherStates,
                SectionKind::Footer,
            ]
        );
        assert!(prose(&model.sections[2]).contains("No active or committed epics found"));
        assert!(prose(&model.sections[3]).contains("No new epics found"));
        assert!(prose(&model.sections[4]).contains("No epics in other states found"));

        let summary = prose(&model.sections[1]);
        assert!(summary.starts_with("This report covers 0 CloudInit-related epics"));
        assert!(summary.contains("across 0 active/committed"));
        assert!(summary.contains("while 0 epics are in 'New'"));
        assert!(summary.contains("No epics were found for area path 'One\\CloudInit'"));
    }

    #[test]
    fn removed_epics_never_appear() {
        let model = build(vec![
            epic(1, "Active", "Migrate DB"),
            epic(2, "New", "X"),
            epic(3, "Removed", "Y"),
        ]);
        let json = serde_json::to_string(&model).expect("serialize");
        assert!(!json.contains("#3)"));
        assert!(!json.contains("\"3\""));
        assert!(json.contains("Removed Epics Excluded: 1"));
    }

    #[test]
    fn active_epic_layout() {
        let mut migrate = epic(1, "Active", "Migrate DB");
        migrate.assignee = "Ben Ryan".into();
        migrate.children = vec![ChildItem {
            id: 11,
            title: "Fix critical registry vulnerability".into(),
            work_item_type: "Task".into(),
            state: "To Do".into(),
            assignee: "Unassigned".into(),
            last_updated: Some(Utc.with_ymd_and_hms(2025, 6, 18, 16, 45, 0).unwrap()),
        }];
        let model = build(vec![migrate, epic(2, "Committed", "Plain work")]);

        let detail: Vec<&Section> = model.sections_of(SectionKind::EpicDetail).collect();
        assert_eq!(detail[0].heading, "1. Migrate DB (#1) ⚠️");
        assert_eq!(detail[0].level, 3);
        assert_eq!(
            prose(detail[0]),
            "State: Active | Assigned: Ben Ryan | Last Updated: 2025-06-18"
        );
        assert_eq!(detail[1].heading, "2. Plain work (#2)");

        let children: Vec<&Section> = model.sections_of(SectionKind::ChildItems).collect();
        match &children[0].content {
            Content::Table(table) => {
                assert_eq!(table.kind, TableKind::ChildItems);
                assert_eq!(table.columns, CHILD_ITEM_COLUMNS);
                assert_eq!(table.rows[0].cells[2], "Task - To Do");
                assert_eq!(table.rows[0].index, 0);
            }
            other => panic!("expected table, got {other:?}"),
        }
        assert_eq!(prose(children[1]), "No child items currently assigned.");

        assert_eq!(model.sections_of(SectionKind::KeyUpdates).count(), 2);
    }

    #[test]
    fn new_and_other_sections() {
        let mut resolved = epic(5, "Resolved", "Grooming Required");
        resolved.assignee = "Vamsi Kavuru".into();
        let model = build(vec![epic(3, "New", "P384 key support"), resolved]);

        let new: Vec<&Section> = model.sections_of(SectionKind::NewEpics).collect();
        match &new[0].content {
            Content::Table(table) => {
                assert_eq!(table.columns, NEW_EPIC_COLUMNS);
                assert_eq!(table.rows[0].cells, vec!["3", "P384 key support", "Unassigned"]);
            }
            other => panic!("expected table, got {other:?}"),
        }

        let other: Vec<&Section> = model.sections_of(SectionKind::OtherStates).collect();
        assert_eq!(
            other[0].content,
            Content::Bullets(vec![
                "Grooming Required (#5) - State: Resolved - Vamsi Kavuru".into()
            ])
        );
    }

    #[test]
    fn header_and_footer_carry_metadata() {
        let model = build(vec![epic(1, "New", "x")]);
        assert_eq!(model.title, "CloudInit Epic Status Report");
        assert_eq!(
            prose(&model.sections[0]),
            "Generated: 2025-07-01 09:30:00 UTC | Source: Azure DevOps (contoso/One) | \
             Area: One\\CloudInit | Iteration: One\\Bromine"
        );

        let footer = model.sections.last().expect("footer");
        assert_eq!(footer.kind, SectionKind::Footer);
        match &footer.content {
            Content::Bullets(items) => {
                assert_eq!(items[0], "Total Epics Analyzed: 1");
                assert!(items.contains(&"Data Source: Azure DevOps (contoso/One)".to_string()));
                assert!(items.iter().any(|i| i.starts_with("Font: Aptos")));
            }
            other => panic!("expected bullets, got {other:?}"),
        }
    }
}
