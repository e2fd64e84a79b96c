//! Spreadsheet print normalization.
//!
//! Exported spreadsheets get clipped or split across pages unless the
//! workbook carries sane print settings. [`SpreadsheetFormatter`] decides
//! those settings once and applies them in two ways:
//!
//! - as a [`PrintLayout`] handed to an office automation session
//! - by rewriting the sheet XML of an `.xlsx` workbook directly
//!   ([`SpreadsheetFormatter::normalize_xlsx`]), no engine required

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::Result;

/// Worksheets wider than this many used columns print landscape.
pub const LANDSCAPE_COLUMN_THRESHOLD: usize = 10;

/// Spreadsheet paper size code for A4.
pub const A4_PAPER_SIZE: u32 = 9;

/// Left and right margins, in inches.
pub const SIDE_MARGIN_INCHES: f64 = 0.15;

/// Top and bottom margins, in inches.
pub const TOP_BOTTOM_MARGIN_INCHES: f64 = 0.2;

const DEFAULT_HEADER_FOOTER_INCHES: f64 = 0.3;

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Taller than wide.
    Portrait,
    /// Wider than tall.
    Landscape,
}

impl Orientation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Page margins, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    /// Left margin.
    pub left: f64,
    /// Right margin.
    pub right: f64,
    /// Top margin.
    pub top: f64,
    /// Bottom margin.
    pub bottom: f64,
}

/// Print settings for one sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintLayout {
    /// Page orientation.
    pub orientation: Orientation,
    /// Paper size code as used by spreadsheet page setup (9 is A4).
    pub paper_size: u32,
    /// Page margins.
    pub margins: Margins,
    /// Pages wide to scale to; `None` leaves scaling alone.
    pub fit_to_width: Option<u32>,
    /// Pages tall to scale to; `Some(0)` means as many as needed.
    pub fit_to_height: Option<u32>,
}

/// Kind of sheet inside a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Grid of cells.
    Worksheet,
    /// A sheet holding a single chart.
    Chart,
}

/// Decides and applies spreadsheet print settings.
#[derive(Debug, Clone, Copy)]
pub struct SpreadsheetFormatter {
    column_threshold: usize,
    paper_size: u32,
    margins: Margins,
}

impl Default for SpreadsheetFormatter {
    fn default() -> Self {
        Self {
            column_threshold: LANDSCAPE_COLUMN_THRESHOLD,
            paper_size: A4_PAPER_SIZE,
            margins: Margins {
                left: SIDE_MARGIN_INCHES,
                right: SIDE_MARGIN_INCHES,
                top: TOP_BOTTOM_MARGIN_INCHES,
                bottom: TOP_BOTTOM_MARGIN_INCHES,
            },
        }
    }
}

impl SpreadsheetFormatter {
    /// Formatter with the standard A4 settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout for a worksheet using `columns` columns.
    pub fn layout_for_worksheet(&self, columns: usize) -> PrintLayout {
        let orientation = if columns > self.column_threshold {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        PrintLayout {
            orientation,
            paper_size: self.paper_size,
            margins: self.margins,
            fit_to_width: Some(1),
            fit_to_height: Some(0),
        }
    }

    /// Layout for a chart sheet.
    pub fn layout_for_chart(&self) -> PrintLayout {
        PrintLayout {
            orientation: Orientation::Landscape,
            paper_size: self.paper_size,
            margins: self.margins,
            fit_to_width: None,
            fit_to_height: None,
        }
    }

    /// Layout for a sheet of the given kind.
    pub fn layout_for(&self, kind: SheetKind, columns: usize) -> PrintLayout {
        match kind {
            SheetKind::Worksheet => self.layout_for_worksheet(columns),
            SheetKind::Chart => self.layout_for_chart(),
        }
    }

    /// Rewrite the print settings of every sheet in the `.xlsx` at `path`.
    ///
    /// Returns the number of sheets touched. Entries other than sheet XML
    /// are copied through unchanged.
    pub fn normalize_xlsx(&self, path: &Path) -> Result<usize> {
        let original = std::fs::read(path)?;
        let mut archive = ZipArchive::new(Cursor::new(original))?;
        let mut output = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut touched = 0;

        for index in 0..archive.len() {
            let name = archive.by_index_raw(index)?.name().to_string();
            let Some(kind) = sheet_kind_for_entry(&name) else {
                output.raw_copy_file(archive.by_index_raw(index)?)?;
                continue;
            };

            let mut xml = Vec::new();
            archive.by_index(index)?.read_to_end(&mut xml)?;
            let rewritten = self.rewrite_sheet_xml(&xml, kind)?;

            output.start_file(name.as_str(), options)?;
            output.write_all(&rewritten)?;
            touched += 1;
            debug!(entry = %name, ?kind, "normalized sheet print settings");
        }

        let bytes = output.finish()?.into_inner();
        std::fs::write(path, bytes)?;
        Ok(touched)
    }

    /// Like [`normalize_xlsx`](Self::normalize_xlsx), but only logs failures.
    pub fn try_normalize_xlsx(&self, path: &Path) -> bool {
        match self.normalize_xlsx(path) {
            Ok(_) => true,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to scale spreadsheet");
                false
            }
        }
    }

    /// Rewrite one worksheet or chartsheet part.
    pub fn rewrite_sheet_xml(&self, xml: &[u8], kind: SheetKind) -> Result<Vec<u8>> {
        SheetRewriter::new(self, kind).run(xml)
    }
}

fn sheet_kind_for_entry(name: &str) -> Option<SheetKind> {
    let (dir, file) = name.rsplit_once('/')?;
    if !file.ends_with(".xml") {
        return None;
    }
    match dir {
        "xl/worksheets" => Some(SheetKind::Worksheet),
        "xl/chartsheets" => Some(SheetKind::Chart),
        _ => None,
    }
}

/// Number of columns spanned by a `<dimension ref>` such as `B2:K40`.
pub fn columns_in_range(range: &str) -> Option<usize> {
    let (start, end) = range.split_once(':').unwrap_or((range, range));
    let first = column_index(start)?;
    let last = column_index(end)?;
    Some(last.abs_diff(first) + 1)
}

fn column_index(cell: &str) -> Option<usize> {
    let letters: String = cell
        .trim()
        .trim_start_matches('$')
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    Some(letters.chars().fold(0usize, |acc, c| {
        acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
    }))
}

/// Sheet children that must come after `pageMargins` and `pageSetup`.
const AFTER_PAGE_SETUP: &[&[u8]] = &[
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"drawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

/// Streaming rewrite of a single sheet part.
///
/// Only direct children of the root element are touched; custom sheet
/// views nest their own `pageMargins`/`pageSetup` which stay as they are.
struct SheetRewriter<'a> {
    formatter: &'a SpreadsheetFormatter,
    kind: SheetKind,
    prefix: Option<String>,
    depth: usize,
    columns: usize,
    seen_first_child: bool,
    in_sheet_pr: bool,
    fit_written: bool,
    margins_written: bool,
    setup_written: bool,
}

impl<'a> SheetRewriter<'a> {
    fn new(formatter: &'a SpreadsheetFormatter, kind: SheetKind) -> Self {
        Self {
            formatter,
            kind,
            prefix: None,
            depth: 0,
            columns: 0,
            seen_first_child: false,
            in_sheet_pr: false,
            fit_written: false,
            margins_written: false,
            setup_written: false,
        }
    }

    fn run(mut self, xml: &[u8]) -> Result<Vec<u8>> {
        let mut reader = Reader::from_reader(xml);
        let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) => {
                    self.on_element(&mut writer, &e, false)?;
                    self.depth += 1;
                }
                Event::Empty(e) => self.on_element(&mut writer, &e, true)?,
                Event::End(e) => {
                    self.depth = self.depth.saturating_sub(1);
                    self.on_end(&mut writer, &e)?;
                }
                other => writer.write_event(other)?,
            }
            buf.clear();
        }

        Ok(writer.into_inner())
    }

    fn name(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    fn layout(&self) -> PrintLayout {
        self.formatter.layout_for(self.kind, self.columns)
    }

    fn on_element(&mut self, writer: &mut Writer<Vec<u8>>, e: &BytesStart, empty: bool) -> Result<()> {
        let local = e.local_name();
        let local = local.as_ref();

        if self.depth == 0 {
            self.prefix = e
                .name()
                .prefix()
                .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
            return write_element(writer, e.clone(), empty);
        }

        if self.depth == 2 && self.in_sheet_pr && local == b"pageSetUpPr" {
            self.fit_written = true;
            return write_element(writer, with_attrs(e, &[("fitToPage", "1".into())]), empty);
        }

        if self.depth != 1 {
            return write_element(writer, e.clone(), empty);
        }

        if !self.seen_first_child {
            self.seen_first_child = true;
            if local != b"sheetPr" && self.kind == SheetKind::Worksheet {
                self.write_sheet_pr(writer)?;
            }
        }

        match local {
            b"sheetPr" if self.kind == SheetKind::Worksheet => {
                if empty {
                    writer.write_event(Event::Start(e.clone()))?;
                    self.write_fit_to_page(writer)?;
                    writer.write_event(Event::End(e.to_end()))?;
                    return Ok(());
                }
                self.in_sheet_pr = true;
                self.fit_written = false;
                write_element(writer, e.clone(), empty)
            }
            b"dimension" => {
                if let Some(range) = attr_value(e, b"ref") {
                    self.columns = columns_in_range(&range).unwrap_or(0);
                }
                write_element(writer, e.clone(), empty)
            }
            b"pageMargins" => {
                let header = attr_value(e, b"header").unwrap_or_default();
                let footer = attr_value(e, b"footer").unwrap_or_default();
                self.write_margins(writer, &header, &footer)
            }
            b"pageSetup" => {
                if !self.margins_written {
                    self.write_margins(writer, "", "")?;
                }
                self.setup_written = true;
                let layout = self.layout();
                write_element(writer, with_attrs(e, &setup_attrs(&layout)), empty)
            }
            other if AFTER_PAGE_SETUP.contains(&other) => {
                self.write_missing_setup(writer)?;
                write_element(writer, e.clone(), empty)
            }
            _ => write_element(writer, e.clone(), empty),
        }
    }

    fn on_end(&mut self, writer: &mut Writer<Vec<u8>>, e: &BytesEnd) -> Result<()> {
        let local = e.local_name();
        let local = local.as_ref();

        if self.depth == 1 && self.in_sheet_pr && local == b"sheetPr" {
            if !self.fit_written {
                self.write_fit_to_page(writer)?;
            }
            self.in_sheet_pr = false;
        }

        if self.depth == 1 && local == b"pageMargins" && self.margins_written {
            // Replaced by the element written at its start tag.
            return Ok(());
        }

        if self.depth == 0 {
            if !self.seen_first_child && self.kind == SheetKind::Worksheet {
                self.seen_first_child = true;
                self.write_sheet_pr(writer)?;
            }
            self.write_missing_setup(writer)?;
        }

        writer.write_event(Event::End(e.clone()))?;
        Ok(())
    }

    fn write_sheet_pr(&mut self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let name = self.name("sheetPr");
        writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
        self.write_fit_to_page(writer)?;
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }

    fn write_fit_to_page(&mut self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut element = BytesStart::new(self.name("pageSetUpPr"));
        element.push_attribute(("fitToPage", "1"));
        writer.write_event(Event::Empty(element))?;
        self.fit_written = true;
        Ok(())
    }

    fn write_missing_setup(&mut self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if !self.margins_written {
            self.write_margins(writer, "", "")?;
        }
        if !self.setup_written {
            self.setup_written = true;
            let mut element = BytesStart::new(self.name("pageSetup"));
            for (key, value) in setup_attrs(&self.layout()) {
                element.push_attribute((key, value.as_str()));
            }
            writer.write_event(Event::Empty(element))?;
        }
        Ok(())
    }

    fn write_margins(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        header: &str,
        footer: &str,
    ) -> Result<()> {
        self.margins_written = true;
        let margins = self.formatter.margins;
        let default_hf = DEFAULT_HEADER_FOOTER_INCHES.to_string();
        let header = if header.is_empty() { default_hf.as_str() } else { header };
        let footer = if footer.is_empty() { default_hf.as_str() } else { footer };

        let mut element = BytesStart::new(self.name("pageMargins"));
        element.push_attribute(("left", margins.left.to_string().as_str()));
        element.push_attribute(("right", margins.right.to_string().as_str()));
        element.push_attribute(("top", margins.top.to_string().as_str()));
        element.push_attribute(("bottom", margins.bottom.to_string().as_str()));
        element.push_attribute(("header", header));
        element.push_attribute(("footer", footer));
        writer.write_event(Event::Empty(element))?;
        Ok(())
    }
}

fn setup_attrs(layout: &PrintLayout) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        ("paperSize", layout.paper_size.to_string()),
        ("orientation", layout.orientation.as_str().to_string()),
    ];
    if let Some(width) = layout.fit_to_width {
        attrs.push(("fitToWidth", width.to_string()));
    }
    if let Some(height) = layout.fit_to_height {
        attrs.push(("fitToHeight", height.to_string()));
    }
    attrs
}

/// Copy of `e` with `overrides` replacing (or adding) unprefixed attributes.
fn with_attrs(e: &BytesStart, overrides: &[(&str, String)]) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        let key = attr.key;
        let replaced = key.prefix().is_none()
            && overrides
                .iter()
                .any(|(k, _)| key.local_name().as_ref() == k.as_bytes());
        if !replaced {
            out.push_attribute(attr);
        }
    }
    for (key, value) in overrides {
        out.push_attribute((*key, value.as_str()));
    }
    out.into_owned()
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.prefix().is_none() && attr.key.local_name().as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn write_element(writer: &mut Writer<Vec<u8>>, e: BytesStart, empty: bool) -> Result<()> {
    if empty {
        writer.write_event(Event::Empty(e))?;
    } else {
        writer.write_event(Event::Start(e))?;
    }
    Ok(())
}
