//! xlsx package writer.
//!
//! Produces a minimal Office Open XML package: content types, package and
//! workbook relationships, workbook, styles, and one part per worksheet.
//! Strings are written inline so no shared string table is needed.

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::cell_ref::cell_ref;
use super::error::SheetError;
use super::{Cell, CellStyle, CellValue, Workbook, Worksheet};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub(super) const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Number of cell formats emitted: {regular, bold} x {default, no wrap, wrap}.
const CELL_XF_COUNT: u32 = 6;

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Escapes text for a `<t>` element.
///
/// Characters XML 1.0 cannot carry become `_xHHHH_`, and an underscore that
/// would otherwise be read back as the start of such an escape becomes
/// `_x005F_`.
fn encode_cell_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (index, ch) in s.char_indices() {
        let illegal = matches!(ch, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}')
            || matches!(ch, '\u{fffe}' | '\u{ffff}');
        if illegal {
            let _ = write!(out, "_x{:04X}_", u32::from(ch));
        } else if ch == '_' && starts_escape(&s[index..]) {
            out.push_str("_x005F_");
        } else {
            out.push(ch);
        }
    }
    escape_xml(&out)
}

/// True when `s` starts with `_xHHHH_`.
pub(super) fn starts_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Maps a style to its index in the `cellXfs` table written by [`styles_xml`].
pub(super) fn style_index(style: CellStyle) -> u32 {
    let wrap = match style.wrap_text {
        None => 0,
        Some(false) => 1,
        Some(true) => 2,
    };
    wrap * 2 + u32::from(style.bold)
}

/// Serializes the workbook and writes it to `path` in one operation.
pub(super) fn write_workbook(workbook: &Workbook, path: &Path) -> Result<(), SheetError> {
    let bytes = package_bytes(workbook, path)?;
    std::fs::write(path, &bytes).map_err(|e| SheetError::io(path, e))?;
    debug!(
        path = %path.display(),
        sheets = workbook.sheets().len(),
        bytes = bytes.len(),
        "workbook saved"
    );
    Ok(())
}

fn package_bytes(workbook: &Workbook, path: &Path) -> Result<Vec<u8>, SheetError> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));

        let mut add_part = |name: &str, content: &str| -> Result<(), SheetError> {
            zip.start_file(name, SimpleFileOptions::default())
                .map_err(|e| SheetError::zip(path, e))?;
            zip.write_all(content.as_bytes())
                .map_err(|e| SheetError::io(path, e))
        };

        add_part("[Content_Types].xml", &content_types_xml(workbook))?;
        add_part("_rels/.rels", &package_rels_xml())?;
        add_part("xl/workbook.xml", &workbook_xml(workbook))?;
        add_part("xl/_rels/workbook.xml.rels", &workbook_rels_xml(workbook))?;
        add_part("xl/styles.xml", &styles_xml())?;

        for (index, sheet) in workbook.sheets().iter().enumerate() {
            let number = index + 1;
            let (sheet_xml, hyperlinks) = worksheet_xml(sheet);
            add_part(&format!("xl/worksheets/sheet{number}.xml"), &sheet_xml)?;
            if !hyperlinks.is_empty() {
                add_part(
                    &format!("xl/worksheets/_rels/sheet{number}.xml.rels"),
                    &hyperlink_rels_xml(&hyperlinks),
                )?;
            }
        }

        zip.finish().map_err(|e| SheetError::zip(path, e))?;
    }
    Ok(buf)
}

fn content_types_xml(workbook: &Workbook) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for number in 1..=workbook.sheets().len() {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut xml = format!(
        r#"{XML_DECLARATION}<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><bookViews><workbookView activeTab="{}"/></bookViews><sheets>"#,
        workbook.active_index()
    );
    for (index, sheet) in workbook.sheets().iter().enumerate() {
        let number = index + 1;
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{number}" r:id="rId{number}"/>"#,
            escape_xml(sheet.name())
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(workbook: &Workbook) -> String {
    let mut xml = format!(r#"{XML_DECLARATION}<Relationships xmlns="{NS_PKG_REL}">"#);
    let sheet_count = workbook.sheets().len();
    for number in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{number}" Type="{REL_WORKSHEET}" Target="worksheets/sheet{number}.xml"/>"#
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{REL_STYLES}" Target="styles.xml"/>"#,
        sheet_count + 1
    );
    xml.push_str("</Relationships>");
    xml
}

fn styles_xml() -> String {
    let mut xml = format!(r#"{XML_DECLARATION}<styleSheet xmlns="{NS_MAIN}">"#);
    xml.push_str(r#"<fonts count="2"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font><font><b/><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>"#);
    xml.push_str(r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#);
    xml.push_str(r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#);
    xml.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);
    let _ = write!(xml, r#"<cellXfs count="{CELL_XF_COUNT}">"#);
    for index in 0..CELL_XF_COUNT {
        let font_id = index % 2;
        let wrap = match index / 2 {
            0 => None,
            1 => Some("0"),
            _ => Some("1"),
        };
        let apply_font = if font_id == 1 { r#" applyFont="1""# } else { "" };
        match wrap {
            None => {
                let _ = write!(
                    xml,
                    r#"<xf numFmtId="0" fontId="{font_id}" fillId="0" borderId="0" xfId="0"{apply_font}/>"#
                );
            }
            Some(flag) => {
                let _ = write!(
                    xml,
                    r#"<xf numFmtId="0" fontId="{font_id}" fillId="0" borderId="0" xfId="0"{apply_font} applyAlignment="1"><alignment wrapText="{flag}"/></xf>"#
                );
            }
        }
    }
    xml.push_str("</cellXfs>");
    xml.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
    xml.push_str("</styleSheet>");
    xml
}

/// Renders a worksheet part and returns it with the hyperlinks it references.
///
/// Hyperlink relationship ids are `rId1..` in the returned order.
fn worksheet_xml(sheet: &Worksheet) -> (String, Vec<(String, String)>) {
    let mut xml = format!(r#"{XML_DECLARATION}<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_REL}">"#);

    let mut widths = sheet.column_widths().peekable();
    if widths.peek().is_some() {
        xml.push_str("<cols>");
        for (col, width) in widths {
            let _ = write!(
                xml,
                r#"<col min="{col}" max="{col}" width="{width}" customWidth="1"/>"#
            );
        }
        xml.push_str("</cols>");
    }

    let mut hyperlinks = Vec::new();
    let mut current_row: Option<u32> = None;
    xml.push_str("<sheetData>");
    for ((row, col), cell) in sheet.cells() {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            let _ = write!(xml, r#"<row r="{row}">"#);
            current_row = Some(row);
        }
        let reference = cell_ref(row, col);
        write_cell(&mut xml, &reference, cell);
        if let Some(target) = &cell.hyperlink {
            hyperlinks.push((reference, target.clone()));
        }
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if !hyperlinks.is_empty() {
        xml.push_str("<hyperlinks>");
        for (index, (reference, _)) in hyperlinks.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<hyperlink ref="{reference}" r:id="rId{}"/>"#,
                index + 1
            );
        }
        xml.push_str("</hyperlinks>");
    }

    xml.push_str("</worksheet>");
    (xml, hyperlinks)
}

fn write_cell(xml: &mut String, reference: &str, cell: &Cell) {
    let style = style_index(cell.style);
    let style_attr = if style == 0 {
        String::new()
    } else {
        format!(r#" s="{style}""#)
    };

    match &cell.value {
        CellValue::Empty => {
            let _ = write!(xml, r#"<c r="{reference}"{style_attr}/>"#);
        }
        CellValue::Text(text) if text.is_empty() => {
            let _ = write!(xml, r#"<c r="{reference}"{style_attr}/>"#);
        }
        CellValue::Text(text) => write_inline_string(xml, reference, &style_attr, text),
        CellValue::Int(value) => {
            let _ = write!(xml, r#"<c r="{reference}"{style_attr}><v>{value}</v></c>"#);
        }
        CellValue::Float(value) if value.is_finite() => {
            let _ = write!(xml, r#"<c r="{reference}"{style_attr}><v>{value}</v></c>"#);
        }
        CellValue::Float(value) => {
            write_inline_string(xml, reference, &style_attr, &value.to_string());
        }
        CellValue::Bool(value) => {
            let _ = write!(
                xml,
                r#"<c r="{reference}"{style_attr} t="b"><v>{}</v></c>"#,
                u8::from(*value)
            );
        }
    }
}

fn write_inline_string(xml: &mut String, reference: &str, style_attr: &str, text: &str) {
    let _ = write!(
        xml,
        r#"<c r="{reference}"{style_attr} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        encode_cell_text(text)
    );
}

fn hyperlink_rels_xml(hyperlinks: &[(String, String)]) -> String {
    let mut xml = format!(r#"{XML_DECLARATION}<Relationships xmlns="{NS_PKG_REL}">"#);
    for (index, (_, target)) in hyperlinks.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{REL_HYPERLINK}" Target="{}" TargetMode="External"/>"#,
            index + 1,
            escape_xml(target)
        );
    }
    xml.push_str("</Relationships>");
    xml
}
