//! Word rendering.
//!
//! [`WordLayout`] owns every formatting decision (font, colors, column widths,
//! row protection) and drives a [`DocumentBuilder`]. [`FlatOpcBuilder`] is the
//! built-in builder: it emits a single-file WordprocessingML package that Word
//! opens directly.

use tracing::{debug, instrument};

use epicreport_shared::{Content, ReportError, ReportModel, Result, SectionKind, Table, TableKind};

/// Convert hundredths of an inch to twips (1440 per inch), exact for all layout widths.
pub const fn centi_inches_to_twips(centi: u32) -> u32 {
    centi * 72 / 5
}

// ---------------------------------------------------------------------------
// Builder capability
// ---------------------------------------------------------------------------

/// Paragraph flavors the layout asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Body,
    /// Centered, italic, small; used under the title.
    Metadata,
    /// Italic placeholder text.
    Note,
}

/// Fill and text styling for one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    /// Hex RGB cell background.
    pub fill: &'static str,
    /// Hex RGB text color, `None` for the document default.
    pub color: Option<&'static str>,
    pub bold: bool,
    pub centered: bool,
    /// Keep the row on one page.
    pub cant_split: bool,
    /// Repeat as header row on page breaks.
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRow {
    pub cells: Vec<String>,
    pub style: RowStyle,
}

/// A table with all styling resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledTable {
    /// Column widths in twips.
    pub widths: Vec<u32>,
    pub rows: Vec<StyledRow>,
}

/// Document-building capability driven by [`WordLayout`].
pub trait DocumentBuilder {
    fn title(&mut self, text: &str);
    /// `level` 1 is the top section level.
    fn heading(&mut self, text: &str, level: u8);
    fn paragraph(&mut self, text: &str, style: ParagraphStyle);
    fn bullets(&mut self, items: &[String]);
    fn table(&mut self, table: &StyledTable);
    fn page_break(&mut self);
    fn finish(self) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Fixed formatting rules for the Word report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLayout {
    pub font: &'static str,
    pub header_fill: &'static str,
    pub header_text: &'static str,
    pub even_row_fill: &'static str,
    pub odd_row_fill: &'static str,
}

impl Default for WordLayout {
    fn default() -> Self {
        Self {
            font: "Aptos",
            header_fill: "4472C4",
            header_text: "FFFFFF",
            even_row_fill: "E8F1FF",
            odd_row_fill: "FFFFFF",
        }
    }
}

impl WordLayout {
    /// Column widths in hundredths of an inch.
    pub fn column_widths(kind: TableKind) -> &'static [u32] {
        match kind {
            TableKind::ChildItems => &[80, 350, 150, 150],
            TableKind::NewEpics => &[100, 450, 180],
        }
    }

    /// Alternating fill by zero-based data row index.
    pub fn row_fill(&self, index: usize) -> &'static str {
        if index % 2 == 0 {
            self.even_row_fill
        } else {
            self.odd_row_fill
        }
    }

    /// Resolve widths and per-row styles for a model table.
    pub fn style_table(&self, table: &Table) -> Result<StyledTable> {
        let widths: Vec<u32> = Self::column_widths(table.kind)
            .iter()
            .map(|c| centi_inches_to_twips(*c))
            .collect();

        if table.columns.len() != widths.len() {
            return Err(ReportError::Render(format!(
                "{:?} table has {} columns, layout expects {}",
                table.kind,
                table.columns.len(),
                widths.len()
            )));
        }

        let mut rows = Vec::with_capacity(table.rows.len() + 1);
        rows.push(StyledRow {
            cells: table.columns.clone(),
            style: RowStyle {
                fill: self.header_fill,
                color: Some(self.header_text),
                bold: true,
                centered: true,
                cant_split: true,
                header: true,
            },
        });

        for row in &table.rows {
            if row.cells.len() != widths.len() {
                return Err(ReportError::Render(format!(
                    "row {} has {} cells, expected {}",
                    row.index,
                    row.cells.len(),
                    widths.len()
                )));
            }
            rows.push(StyledRow {
                cells: row.cells.clone(),
                style: RowStyle {
                    fill: self.row_fill(row.index),
                    color: None,
                    bold: false,
                    centered: false,
                    cant_split: true,
                    header: false,
                },
            });
        }

        Ok(StyledTable { widths, rows })
    }

    /// Drive `builder` through the model.
    pub fn apply<B: DocumentBuilder>(&self, model: &ReportModel, builder: &mut B) -> Result<()> {
        for section in &model.sections {
            if section.kind == SectionKind::Header {
                builder.title(&section.heading);
                if let Content::Prose(text) = &section.content {
                    builder.paragraph(text, ParagraphStyle::Metadata);
                }
                continue;
            }

            if section.kind == SectionKind::Footer {
                builder.page_break();
            }
            builder.heading(&section.heading, section.level.saturating_sub(1).max(1));

            match &section.content {
                Content::Prose(text) => {
                    let style = match section.kind {
                        SectionKind::ChildItems
                        | SectionKind::ActiveCommitted
                        | SectionKind::NewEpics
                        | SectionKind::OtherStates => ParagraphStyle::Note,
                        _ => ParagraphStyle::Body,
                    };
                    builder.paragraph(text, style);
                }
                Content::Bullets(items) => builder.bullets(items),
                Content::Table(table) => builder.table(&self.style_table(table)?),
            }
        }
        Ok(())
    }
}

/// Render the model as a Flat OPC Word document using the default layout.
#[instrument(skip_all)]
pub fn render(model: &ReportModel) -> Result<Vec<u8>> {
    let layout = WordLayout::default();
    let mut builder = FlatOpcBuilder::new(layout.font, &model.title);
    layout.apply(model, &mut builder)?;
    builder.finish()
}

// ---------------------------------------------------------------------------
// Flat OPC builder
// ---------------------------------------------------------------------------

const BULLET_NUM_ID: u32 = 1;

/// Builds a single-file WordprocessingML package (`pkg:package`).
#[derive(Debug)]
pub struct FlatOpcBuilder {
    font: String,
    title: String,
    body: String,
    tables: usize,
}

impl FlatOpcBuilder {
    pub fn new(font: &str, title: &str) -> Self {
        Self {
            font: font.to_string(),
            title: title.to_string(),
            body: String::new(),
            tables: 0,
        }
    }

    fn push_paragraph(&mut self, ppr: &str, rpr: &str, text: &str) {
        self.body.push_str("<w:p>");
        if !ppr.is_empty() {
            self.body.push_str("<w:pPr>");
            self.body.push_str(ppr);
            self.body.push_str("</w:pPr>");
        }
        push_run(&mut self.body, rpr, text);
        self.body.push_str("</w:p>");
    }

    fn styles_xml(&self) -> String {
        let font = escape_xml(&self.font);
        let mut xml = String::new();
        xml.push_str(
            r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        );
        xml.push_str(&format!(
            r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults>"#
        ));
        xml.push_str(
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
        );
        xml.push_str(
            r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style>"#,
        );
        for (level, size, color) in [(1, 32, "2F5496"), (2, 28, "000000"), (3, 24, "000000")] {
            xml.push_str(&format!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="60"/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:color w:val="{color}"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#,
                level - 1
            ));
        }
        xml.push_str(
            r#"<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:spacing w:after="0"/></w:pPr></w:style>"#,
        );
        xml.push_str("</w:styles>");
        xml
    }

    fn numbering_xml() -> String {
        format!(
            r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#
        )
    }
}

impl DocumentBuilder for FlatOpcBuilder {
    fn title(&mut self, text: &str) {
        self.push_paragraph(r#"<w:pStyle w:val="Title"/>"#, "", text);
    }

    fn heading(&mut self, text: &str, level: u8) {
        let level = level.clamp(1, 3);
        self.push_paragraph(&format!(r#"<w:pStyle w:val="Heading{level}"/>"#), "", text);
    }

    fn paragraph(&mut self, text: &str, style: ParagraphStyle) {
        match style {
            ParagraphStyle::Body => self.push_paragraph("", "", text),
            ParagraphStyle::Metadata => self.push_paragraph(
                r#"<w:jc w:val="center"/>"#,
                r#"<w:i/><w:sz w:val="20"/><w:szCs w:val="20"/>"#,
                text,
            ),
            ParagraphStyle::Note => self.push_paragraph("", "<w:i/>", text),
        }
    }

    fn bullets(&mut self, items: &[String]) {
        for item in items {
            self.push_paragraph(
                &format!(
                    r#"<w:pStyle w:val="ListBullet"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{BULLET_NUM_ID}"/></w:numPr>"#
                ),
                "",
                item,
            );
        }
    }

    fn table(&mut self, table: &StyledTable) {
        self.tables += 1;
        let total: u32 = table.widths.iter().sum();

        self.body.push_str("<w:tbl><w:tblPr>");
        self.body
            .push_str(&format!(r#"<w:tblW w:w="{total}" w:type="dxa"/>"#));
        self.body.push_str("<w:tblBorders>");
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            self.body.push_str(&format!(
                r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#
            ));
        }
        self.body
            .push_str(r#"</w:tblBorders><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#);
        for w in &table.widths {
            self.body.push_str(&format!(r#"<w:gridCol w:w="{w}"/>"#));
        }
        self.body.push_str("</w:tblGrid>");

        for row in &table.rows {
            let style = row.style;
            self.body.push_str("<w:tr>");
            if style.cant_split || style.header {
                self.body.push_str("<w:trPr>");
                if style.cant_split {
                    self.body.push_str("<w:cantSplit/>");
                }
                if style.header {
                    self.body.push_str("<w:tblHeader/>");
                }
                self.body.push_str("</w:trPr>");
            }

            let mut rpr = String::new();
            if style.bold {
                rpr.push_str("<w:b/>");
            }
            if let Some(color) = style.color {
                rpr.push_str(&format!(r#"<w:color w:val="{color}"/>"#));
            }
            rpr.push_str(r#"<w:sz w:val="20"/><w:szCs w:val="20"/>"#);

            for (cell, width) in row.cells.iter().zip(&table.widths) {
                self.body.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/><w:shd w:val="clear" w:color="auto" w:fill="{}"/></w:tcPr><w:p>"#,
                    style.fill
                ));
                let jc = if style.centered { "center" } else { "left" };
                self.body.push_str(&format!(
                    r#"<w:pPr><w:spacing w:before="40" w:after="40"/><w:jc w:val="{jc}"/></w:pPr>"#
                ));
                push_run(&mut self.body, &rpr, cell);
                self.body.push_str("</w:p></w:tc>");
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        // Word requires a paragraph between adjacent tables.
        self.push_paragraph(r#"<w:spacing w:before="0" w:after="0"/>"#, "", "");
    }

    fn page_break(&mut self) {
        self.body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    fn finish(self) -> Result<Vec<u8>> {
        debug!(tables = self.tables, size = self.body.len(), "finishing word package");

        let mut xml = String::with_capacity(self.body.len() + 4096);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(r#"<?mso-application progid="Word.Document"?>"#);
        xml.push('\n');
        xml.push_str(r#"<pkg:package xmlns:pkg="http://schemas.microsoft.com/office/2006/xmlPackage">"#);

        push_part(
            &mut xml,
            "/_rels/.rels",
            "application/vnd.openxmlformats-package.relationships+xml",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#,
        );
        push_part(
            &mut xml,
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
            &format!(
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title><dc:creator>epicreport</dc:creator></cp:coreProperties>"#,
                escape_xml(&self.title)
            ),
        );
        push_part(
            &mut xml,
            "/word/_rels/document.xml.rels",
            "application/vnd.openxmlformats-package.relationships+xml",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#,
        );
        push_part(
            &mut xml,
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            &format!(
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1080" w:bottom="1440" w:left="1080" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#,
                self.body
            ),
        );
        push_part(
            &mut xml,
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            &self.styles_xml(),
        );
        push_part(
            &mut xml,
            "/word/numbering.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
            &Self::numbering_xml(),
        );

        xml.push_str("</pkg:package>\n");
        Ok(xml.into_bytes())
    }
}

fn push_part(xml: &mut String, name: &str, content_type: &str, data: &str) {
    xml.push_str(&format!(
        r#"<pkg:part pkg:name="{name}" pkg:contentType="{content_type}"><pkg:xmlData>{data}</pkg:xmlData></pkg:part>"#
    ));
}

fn push_run(out: &mut String, rpr: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str("<w:r>");
    if !rpr.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(rpr);
        out.push_str("</w:rPr>");
    }
    out.push_str(r#"<w:t xml:space="preserve">"#);
    out.push_str(&escape_xml(text));
    out.push_str("</w:t></w:r>");
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are invalid in XML 1.0.
            c if c.is_control() && c != '\t' && c != '\n' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_model;
    use epicreport_shared::TableRow;

    /// Records builder calls for layout assertions.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        tables: Vec<StyledTable>,
    }

    impl DocumentBuilder for Recorder {
        fn title(&mut self, text: &str) {
            self.calls.push(format!("title:{text}"));
        }
        fn heading(&mut self, text: &str, level: u8) {
            self.calls.push(format!("h{level}:{text}"));
        }
        fn paragraph(&mut self, text: &str, style: ParagraphStyle) {
            self.calls.push(format!("p({style:?}):{text}"));
        }
        fn bullets(&mut self, items: &[String]) {
            self.calls.push(format!("bullets:{}", items.len()));
        }
        fn table(&mut self, table: &StyledTable) {
            self.calls.push(format!("table:{}", table.rows.len()));
            self.tables.push(table.clone());
        }
        fn page_break(&mut self) {
            self.calls.push("break".into());
        }
        fn finish(self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn recorded() -> Recorder {
        let mut recorder = Recorder::default();
        WordLayout::default()
            .apply(&sample_model(), &mut recorder)
            .unwrap();
        recorder
    }

    #[test]
    fn twips_conversion_is_exact() {
        let child: Vec<u32> = WordLayout::column_widths(TableKind::ChildItems)
            .iter()
            .map(|c| centi_inches_to_twips(*c))
            .collect();
        assert_eq!(child, vec![1152, 5040, 2160, 2160]);

        let new: Vec<u32> = WordLayout::column_widths(TableKind::NewEpics)
            .iter()
            .map(|c| centi_inches_to_twips(*c))
            .collect();
        assert_eq!(new, vec![1440, 6480, 2592]);
    }

    #[test]
    fn layout_call_sequence() {
        let calls = recorded().calls;
        assert_eq!(calls[0], "title:CloudInit Epic Status Report");
        assert!(calls[1].starts_with("p(Metadata):Generated:"));
        assert_eq!(calls[2], "h1:Executive Summary");
        assert!(calls.contains(&"h2:1. Test and Migrate to Aurora (#33047787) ⚠️".to_string()));
        assert!(calls.contains(&"h3:Key Updates".to_string()));
        assert!(calls.contains(&"p(Note):No epics in other states found.".to_string()));

        let brk = calls.iter().position(|c| c == "break").unwrap();
        assert_eq!(calls[brk + 1], "h1:Report Details");
    }

    #[test]
    fn table_styling() {
        let tables = recorded().tables;
        let child = &tables[0];

        assert_eq!(child.rows.len(), 3);
        let header = child.rows[0].style;
        assert_eq!(header.fill, "4472C4");
        assert_eq!(header.color, Some("FFFFFF"));
        assert!(header.bold);
        assert_eq!(child.rows[1].style.fill, "E8F1FF");
        assert_eq!(child.rows[2].style.fill, "FFFFFF");
        assert!(child.rows.iter().all(|r| r.style.cant_split));

        assert_eq!(tables[1].widths, vec![1440, 6480, 2592]);
    }

    #[test]
    fn mismatched_row_is_render_error() {
        let table = Table {
            kind: TableKind::NewEpics,
            columns: vec!["Epic ID".into(), "Title".into(), "Assigned To".into()],
            rows: vec![TableRow {
                index: 0,
                cells: vec!["1".into()],
            }],
        };
        let err = WordLayout::default().style_table(&table).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
    }

    #[test]
    fn package_contents() {
        let xml = String::from_utf8(render(&sample_model()).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert!(xml.contains("<?mso-application progid=\"Word.Document\"?>"));
        assert!(xml.contains(r#"w:ascii="Aptos""#));
        assert!(xml.contains(r#"w:fill="4472C4""#));
        assert!(xml.contains(r#"w:fill="E8F1FF""#));
        assert!(xml.contains(r#"<w:gridCol w:w="5040"/>"#));
        assert_eq!(xml.matches("<w:cantSplit/>").count(), 3 + 2);
        assert!(xml.contains("Validate A|B rollout &lt;staging&gt;"));
        assert!(xml.contains("Type &amp; State"));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
    }

    #[test]
    fn escape_strips_invalid_control_chars() {
        assert_eq!(escape_xml("a\u{0007}b\t\"c\""), "ab\t&quot;c&quot;");
    }
}
