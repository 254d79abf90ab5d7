//! xlsx package reader.
//!
//! Reads workbooks written by [`super::writer`] as well as files saved by
//! spreadsheet applications: relationship-resolved parts, shared strings,
//! inline strings, styles (bold font, wrap alignment), column widths, and
//! hyperlink targets.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use super::cell_ref::parse_cell_ref;
use super::error::SheetError;
use super::writer::{REL_HYPERLINK, starts_escape};
use super::{Cell, CellStyle, CellValue, Workbook, Worksheet};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const PACKAGE_RELS_PART: &str = "_rels/.rels";

type Attrs = Vec<(Vec<u8>, String)>;

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

pub(super) fn read_workbook(path: &Path) -> Result<Workbook, SheetError> {
    let file = File::open(path).map_err(|e| SheetError::io(path, e))?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| SheetError::zip(path, e))?;
    let mut package = Package {
        archive,
        path: path.to_path_buf(),
    };

    let workbook_part = package.office_document_part()?;
    let workbook_xml = package.read_part(&workbook_part)?;
    let (sheet_entries, active) = parse_workbook(&workbook_xml, &workbook_part)?;
    let workbook_rels = package.read_relationships(&workbook_part)?;

    let shared_strings = match find_by_type(&workbook_rels, "/sharedStrings") {
        Some(rel) => match package.read_optional_part(&rel.target)? {
            Some(xml) => parse_shared_strings(&xml, &rel.target)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let styles = match find_by_type(&workbook_rels, "/styles") {
        Some(rel) => match package.read_optional_part(&rel.target)? {
            Some(xml) => parse_styles(&xml, &rel.target)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let mut workbook = Workbook::new();
    for (name, rel_id) in sheet_entries {
        let Some(rel) = workbook_rels.iter().find(|rel| rel.id == rel_id) else {
            return Err(SheetError::xml(
                workbook_part.clone(),
                format!("sheet '{name}' references unknown relationship {rel_id}"),
            ));
        };
        let sheet_xml = package.read_part(&rel.target)?;
        let sheet_rels = package.read_relationships(&rel.target)?;
        let sheet = parse_worksheet(
            &sheet_xml,
            &rel.target,
            name,
            &shared_strings,
            &styles,
            &sheet_rels,
        )?;
        debug!(sheet = sheet.name(), rows = sheet.max_row(), "worksheet loaded");
        workbook.add_sheet(sheet)?;
    }
    workbook.set_active(active);
    Ok(workbook)
}

struct Package<R> {
    archive: ZipArchive<R>,
    path: PathBuf,
}

impl<R: Read + Seek> Package<R> {
    fn read_optional_part(&mut self, name: &str) -> Result<Option<String>, SheetError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(SheetError::zip(&self.path, e)),
        };
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| SheetError::io(&self.path, e))?;
        Ok(Some(content))
    }

    fn read_part(&mut self, name: &str) -> Result<String, SheetError> {
        self.read_optional_part(name)?
            .ok_or_else(|| SheetError::missing_part(name))
    }

    fn read_relationships(&mut self, part: &str) -> Result<Vec<Relationship>, SheetError> {
        let rels_part = rels_part_for(part);
        match self.read_optional_part(&rels_part)? {
            Some(xml) => parse_relationships(&xml, &rels_part, part),
            None => Ok(Vec::new()),
        }
    }

    fn office_document_part(&mut self) -> Result<String, SheetError> {
        let Some(xml) = self.read_optional_part(PACKAGE_RELS_PART)? else {
            return Ok(DEFAULT_WORKBOOK_PART.to_string());
        };
        let rels = parse_relationships(&xml, PACKAGE_RELS_PART, "")?;
        Ok(find_by_type(&rels, "/officeDocument")
            .map_or_else(|| DEFAULT_WORKBOOK_PART.to_string(), |rel| rel.target.clone()))
    }
}

fn find_by_type<'a>(rels: &'a [Relationship], suffix: &str) -> Option<&'a Relationship> {
    rels.iter().find(|rel| rel.rel_type.ends_with(suffix))
}

/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`.
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the part that owns the relationship.
fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn collect_attrs(element: &BytesStart<'_>, part: &str) -> Result<Attrs, SheetError> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| SheetError::xml(part, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SheetError::xml(part, e))?;
        attrs.push((attr.key.local_name().as_ref().to_vec(), value.into_owned()));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a Attrs, key: &[u8]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name.as_slice() == key)
        .map(|(_, value)| value.as_str())
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true")
}

fn parse_relationships(
    xml: &str,
    part: &str,
    owner_part: &str,
) -> Result<Vec<Relationship>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let attrs = collect_attrs(&e, part)?;
                let (Some(id), Some(target)) = (attr(&attrs, b"Id"), attr(&attrs, b"Target"))
                else {
                    continue;
                };
                let external = attr(&attrs, b"TargetMode") == Some("External");
                rels.push(Relationship {
                    id: id.to_string(),
                    rel_type: attr(&attrs, b"Type").unwrap_or_default().to_string(),
                    target: if external {
                        target.to_string()
                    } else {
                        resolve_target(owner_part, target)
                    },
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(part, e)),
            _ => {}
        }
    }
    Ok(rels)
}

fn parse_workbook(xml: &str, part: &str) -> Result<(Vec<(String, String)>, usize), SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut active = 0;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let attrs = collect_attrs(&e, part)?;
                    let (Some(name), Some(rel_id)) = (attr(&attrs, b"name"), attr(&attrs, b"id"))
                    else {
                        return Err(SheetError::xml(part, "sheet entry without name or r:id"));
                    };
                    sheets.push((name.to_string(), rel_id.to_string()));
                }
                b"workbookView" => {
                    let attrs = collect_attrs(&e, part)?;
                    active = attr(&attrs, b"activeTab")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(part, e)),
            _ => {}
        }
    }
    Ok((sheets, active))
}

/// Decodes `_xHHHH_` escapes in cell text.
fn decode_cell_text(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(index) = rest.find("_x") {
        out.push_str(&rest[..index]);
        rest = &rest[index..];
        let decoded = starts_escape(rest)
            .then(|| u32::from_str_radix(&rest[2..6], 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[7..];
            }
            None => {
                out.push('_');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_shared_strings(xml: &str, part: &str) -> Result<Vec<String>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = phonetic_depth == 0,
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| SheetError::xml(part, e))?;
                current.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(decode_cell_text(&std::mem::take(&mut current))),
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(part, e)),
            _ => {}
        }
    }
    Ok(strings)
}

/// Returns one [`CellStyle`] per `cellXfs` entry.
fn parse_styles(xml: &str, part: &str) -> Result<Vec<CellStyle>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut font_bold: Vec<bool> = Vec::new();
    let mut xfs: Vec<(usize, Option<bool>)> = Vec::new();
    let mut in_fonts = false;
    let mut in_cell_xfs = false;

    loop {
        buf.clear();
        let (element, is_start) = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => (e, true),
            Ok(Event::Empty(e)) => (e, false),
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"fonts" => in_fonts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SheetError::xml(part, e)),
            _ => continue,
        };

        match element.local_name().as_ref() {
            b"fonts" => in_fonts = is_start,
            b"cellXfs" => in_cell_xfs = is_start,
            b"font" if in_fonts => font_bold.push(false),
            b"b" if in_fonts => {
                let attrs = collect_attrs(&element, part)?;
                let bold = attr(&attrs, b"val").is_none_or(is_truthy);
                if let Some(last) = font_bold.last_mut() {
                    *last = bold;
                }
            }
            b"xf" if in_cell_xfs => {
                let attrs = collect_attrs(&element, part)?;
                let font_id = attr(&attrs, b"fontId")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                xfs.push((font_id, None));
            }
            b"alignment" if in_cell_xfs => {
                let attrs = collect_attrs(&element, part)?;
                if let (Some(last), Some(wrap)) = (xfs.last_mut(), attr(&attrs, b"wrapText")) {
                    last.1 = Some(is_truthy(wrap));
                }
            }
            _ => {}
        }
    }

    Ok(xfs
        .into_iter()
        .map(|(font_id, wrap_text)| CellStyle {
            bold: font_bold.get(font_id).copied().unwrap_or(false),
            wrap_text,
        })
        .collect())
}

#[derive(Debug, Default)]
struct PendingCell {
    row: u32,
    col: u32,
    kind: Option<String>,
    style: usize,
    value: String,
    inline: String,
}

fn parse_worksheet(
    xml: &str,
    part: &str,
    name: String,
    shared_strings: &[String],
    styles: &[CellStyle],
    rels: &[Relationship],
) -> Result<Worksheet, SheetError> {
    let mut sheet = Worksheet::new(name)?;
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut current_row: u32 = 0;
    let mut last_col: u32 = 0;
    let mut pending: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;
    let mut hyperlinks: Vec<Attrs> = Vec::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| SheetError::xml(part, e))?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => {
                match e.local_name().as_ref() {
                    b"row" => {
                        let attrs = collect_attrs(&e, part)?;
                        current_row = attr(&attrs, b"r")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(current_row + 1);
                        last_col = 0;
                    }
                    b"c" => {
                        let attrs = collect_attrs(&e, part)?;
                        let (row, col) = match attr(&attrs, b"r") {
                            Some(reference) => parse_cell_ref(reference)?,
                            None => (current_row, last_col + 1),
                        };
                        last_col = col;
                        let cell = PendingCell {
                            row,
                            col,
                            kind: attr(&attrs, b"t").map(str::to_string),
                            style: attr(&attrs, b"s").and_then(|v| v.parse().ok()).unwrap_or(0),
                            ..PendingCell::default()
                        };
                        if is_empty {
                            store_cell(&mut sheet, cell, shared_strings, styles, part)?;
                        } else {
                            pending = Some(cell);
                        }
                    }
                    b"v" if !is_empty => in_value = true,
                    b"is" if !is_empty => in_inline = true,
                    b"t" if !is_empty => in_text = in_inline && phonetic_depth == 0,
                    b"rPh" if !is_empty => phonetic_depth += 1,
                    b"col" => {
                        let attrs = collect_attrs(&e, part)?;
                        let min: u32 = attr(&attrs, b"min").and_then(|v| v.parse().ok()).unwrap_or(0);
                        let max: u32 = attr(&attrs, b"max").and_then(|v| v.parse().ok()).unwrap_or(min);
                        if let Some(width) = attr(&attrs, b"width").and_then(|v| v.parse().ok()) {
                            for col in min.max(1)..=max.min(super::MAX_COLUMNS) {
                                sheet.set_column_width(col, width);
                            }
                        }
                    }
                    b"hyperlink" => hyperlinks.push(collect_attrs(&e, part)?),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some(cell) = pending.as_mut() {
                    if in_value {
                        let text = t.unescape().map_err(|e| SheetError::xml(part, e))?;
                        cell.value.push_str(&text);
                    } else if in_text {
                        let text = t.unescape().map_err(|e| SheetError::xml(part, e))?;
                        cell.inline.push_str(&text);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(cell) = pending.take() {
                        store_cell(&mut sheet, cell, shared_strings, styles, part)?;
                    }
                }
                b"v" => in_value = false,
                b"is" => in_inline = false,
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    for attrs in hyperlinks {
        let Some(reference) = attr(&attrs, b"ref") else {
            continue;
        };
        let first = reference.split(':').next().unwrap_or(reference);
        let (row, col) = parse_cell_ref(first)?;
        let target = match attr(&attrs, b"id") {
            Some(rel_id) => rels
                .iter()
                .find(|rel| rel.id == rel_id && rel.rel_type == REL_HYPERLINK)
                .map(|rel| rel.target.clone()),
            None => attr(&attrs, b"location").map(|location| format!("#{location}")),
        };
        match target {
            Some(target) => sheet.set_hyperlink(row, col, target)?,
            None => warn!(part, cell = reference, "hyperlink without resolvable target"),
        }
    }

    Ok(sheet)
}

fn store_cell(
    sheet: &mut Worksheet,
    cell: PendingCell,
    shared_strings: &[String],
    styles: &[CellStyle],
    part: &str,
) -> Result<(), SheetError> {
    let style = styles.get(cell.style).copied().unwrap_or_default();
    let (row, col) = (cell.row, cell.col);
    let value = cell_value(cell, shared_strings, part)?;
    let hyperlink = sheet.cell(row, col).and_then(|c| c.hyperlink.clone());
    sheet.set_cell(
        row,
        col,
        Cell {
            value,
            style,
            hyperlink,
        },
    )
}

fn cell_value(
    cell: PendingCell,
    shared_strings: &[String],
    part: &str,
) -> Result<CellValue, SheetError> {
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let index: usize = cell.value.trim().parse().map_err(|_| {
                SheetError::xml(part, format!("invalid shared string index '{}'", cell.value))
            })?;
            let text = shared_strings.get(index).ok_or_else(|| {
                SheetError::xml(part, format!("shared string index {index} out of range"))
            })?;
            CellValue::Text(text.clone())
        }
        Some("inlineStr") => CellValue::Text(decode_cell_text(&cell.inline)),
        Some("str" | "e") => CellValue::Text(cell.value),
        Some("b") => CellValue::Bool(is_truthy(cell.value.trim())),
        _ => numeric_value(&cell.value),
    };
    Ok(match value {
        CellValue::Text(text) if text.is_empty() => CellValue::Empty,
        other => other,
    })
}

fn numeric_value(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return CellValue::Int(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) => CellValue::Float(value),
        Err(_) => CellValue::Text(raw.to_string()),
    }
}
