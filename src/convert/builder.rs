//! Schema-driven table construction.
//!
//! [`build`] walks the schema in order and lays the document out either as
//! one flat `Compact` sheet with dotted headers or as one sheet per schema
//! sheet. Row 1 always holds headers; data starts at row 2.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::OutputMethod;
use super::coerce::coerce;
use super::error::{BuildPhase, ConvertError};
use crate::schema::{Schema, SheetSpec};
use crate::sheet::{Cell, CellStyle, CellValue, MAX_COLUMNS, MAX_ROWS, Workbook, Worksheet};

/// Header used for the single column of a sheet without named columns.
pub const NO_HEADER: &str = "no header";

/// Title of the only sheet produced in compact mode.
pub const COMPACT_SHEET_NAME: &str = "Compact";

/// Display width applied to every header column.
pub const HEADER_COLUMN_WIDTH: f64 = 20.0;

const HEADER_ROW: u32 = 1;
const FIRST_DATA_ROW: u32 = 2;

/// One output column resolved against the document.
struct ColumnData<'a> {
    column: Option<&'a str>,
    values: &'a [Value],
}

/// Builds a workbook from a document.
///
/// Nothing is returned unless every sheet was built; the caller saves the
/// workbook only on success.
///
/// # Errors
///
/// Returns [`ConvertError::DocumentNotObject`] when the document root is
/// not an object, [`ConvertError::SchemaMismatch`] when a sheet or column
/// key is missing, is not a list, or column lists of one sheet differ in
/// length, and [`ConvertError::Build`] when the spreadsheet model rejects a
/// sheet name or position.
pub fn build(
    schema: &Schema,
    document: &Value,
    method: OutputMethod,
) -> Result<Workbook, ConvertError> {
    let Value::Object(root) = document else {
        return Err(ConvertError::DocumentNotObject {
            found: json_type(document),
        });
    };

    let mut workbook = Workbook::new();
    match method {
        OutputMethod::Compact => {
            let mut sheet = Worksheet::new(COMPACT_SHEET_NAME)
                .map_err(|e| ConvertError::build(BuildPhase::Header, COMPACT_SHEET_NAME, e))?;
            let mut col: u32 = 1;
            for spec in schema.sheets() {
                info!(sheet = %spec.name, "processing sheet");
                for data in resolve_columns(spec, root)? {
                    let header = match data.column {
                        Some(column) => format!("{}.{column}", spec.name),
                        None => spec.name.clone(),
                    };
                    write_header(&mut sheet, col, header, &spec.name)?;
                    populate(&mut sheet, col, data.values, &spec.name)?;
                    col += 1;
                }
            }
            workbook
                .add_sheet(sheet)
                .map_err(|e| ConvertError::build(BuildPhase::Header, COMPACT_SHEET_NAME, e))?;
        }
        OutputMethod::Full => {
            for spec in schema.sheets() {
                info!(sheet = %spec.name, "processing sheet");
                let mut sheet = Worksheet::new(spec.name.as_str())
                    .map_err(|e| ConvertError::build(BuildPhase::Header, &spec.name, e))?;
                let columns = resolve_columns(spec, root)?;
                for (col, data) in (1..).zip(&columns) {
                    write_header(&mut sheet, col, data.column.unwrap_or(NO_HEADER), &spec.name)?;
                }
                for (col, data) in (1..).zip(&columns) {
                    populate(&mut sheet, col, data.values, &spec.name)?;
                }
                workbook
                    .add_sheet(sheet)
                    .map_err(|e| ConvertError::build(BuildPhase::Header, &spec.name, e))?;
            }
        }
    }
    Ok(workbook)
}

/// Looks up every column list of one sheet and checks they line up.
fn resolve_columns<'a>(
    spec: &'a SheetSpec,
    root: &'a Map<String, Value>,
) -> Result<Vec<ColumnData<'a>>, ConvertError> {
    let phase = BuildPhase::Population;
    let entry = root.get(&spec.name).ok_or_else(|| {
        ConvertError::sheet_mismatch(phase, &spec.name, "document has no such key")
    })?;

    if spec.is_headerless() {
        let Value::Array(values) = entry else {
            return Err(ConvertError::sheet_mismatch(
                phase,
                &spec.name,
                format!("expected a list, found {}", json_type(entry)),
            ));
        };
        return Ok(vec![ColumnData {
            column: None,
            values,
        }]);
    }

    let Value::Object(fields) = entry else {
        return Err(ConvertError::sheet_mismatch(
            phase,
            &spec.name,
            format!("expected an object keyed by column, found {}", json_type(entry)),
        ));
    };

    let mut columns = Vec::with_capacity(spec.columns.len());
    for column in &spec.columns {
        let value = fields.get(column).ok_or_else(|| {
            ConvertError::column_mismatch(phase, &spec.name, column, "document has no such key")
        })?;
        let Value::Array(values) = value else {
            return Err(ConvertError::column_mismatch(
                phase,
                &spec.name,
                column,
                format!("expected a list, found {}", json_type(value)),
            ));
        };
        columns.push(ColumnData {
            column: Some(column),
            values,
        });
    }

    if let Some((first, rest)) = columns.split_first() {
        let expected = first.values.len();
        if let Some(mismatch) = rest.iter().find(|data| data.values.len() != expected) {
            return Err(ConvertError::column_mismatch(
                phase,
                &spec.name,
                mismatch.column.unwrap_or_default(),
                format!(
                    "has {} values but column '{}' has {expected}",
                    mismatch.values.len(),
                    first.column.unwrap_or_default()
                ),
            ));
        }
    }
    Ok(columns)
}

fn write_header(
    sheet: &mut Worksheet,
    col: u32,
    header: impl Into<String>,
    sheet_name: &str,
) -> Result<(), ConvertError> {
    if col > MAX_COLUMNS {
        return Err(ConvertError::sheet_mismatch(
            BuildPhase::Header,
            sheet_name,
            format!("more than {MAX_COLUMNS} columns"),
        ));
    }
    let header = CellValue::Text(header.into());
    sheet
        .set_cell(HEADER_ROW, col, Cell::new(header, CellStyle::HEADER))
        .map_err(|e| ConvertError::build(BuildPhase::Header, sheet_name, e))?;
    sheet.set_column_width(col, HEADER_COLUMN_WIDTH);
    Ok(())
}

fn populate(
    sheet: &mut Worksheet,
    col: u32,
    values: &[Value],
    sheet_name: &str,
) -> Result<(), ConvertError> {
    let available = MAX_ROWS - HEADER_ROW;
    if values.len() > available as usize {
        return Err(ConvertError::sheet_mismatch(
            BuildPhase::Population,
            sheet_name,
            format!("{} values exceed the {available} available rows", values.len()),
        ));
    }
    let mut escaped = 0usize;
    for (row, value) in (FIRST_DATA_ROW..).zip(values) {
        let coerced = coerce(value);
        escaped += usize::from(coerced.formula_escaped);
        sheet
            .set_cell(row, col, Cell::new(coerced.value, CellStyle::DATA))
            .map_err(|e| ConvertError::build(BuildPhase::Population, sheet_name, e))?;
    }
    debug!(
        sheet = sheet_name,
        col,
        rows = values.len(),
        formula_escaped = escaped,
        "column populated"
    );
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sheet::SheetSource;

    fn small_schema() -> Schema {
        Schema::new(vec![
            SheetSpec::new("Documents", Vec::<String>::new()),
            SheetSpec::new("Owner", ["Name", "Location"]),
        ])
        .unwrap()
    }

    fn small_document() -> Value {
        json!({
            "Documents": ["doc-1", ["=HYPERLINK(x)"]],
            "Owner": {"Name": ["Acme", null], "Location": [["Leiden"], ["a", "b"]]}
        })
    }

    #[test]
    fn test_build_compact_single_sheet_dotted_headers() {
        let book = build(&small_schema(), &small_document(), OutputMethod::Compact).unwrap();
        assert_eq!(book.sheets().len(), 1);
        let sheet = &book.sheets()[0];
        assert_eq!(sheet.name(), COMPACT_SHEET_NAME);
        assert_eq!(sheet.cell_value(1, 1), &CellValue::from("Documents"));
        assert_eq!(sheet.cell_value(1, 2), &CellValue::from("Owner.Name"));
        assert_eq!(sheet.cell_value(1, 3), &CellValue::from("Owner.Location"));
        assert_eq!(sheet.cell_value(3, 1), &CellValue::from(r#""=HYPERLINK(x)""#));
        assert_eq!(sheet.cell_value(2, 3), &CellValue::from("Leiden"));
        assert_eq!(sheet.cell_value(3, 3), &CellValue::from(r#"["a","b"]"#));
        assert_eq!(sheet.max_column(), 3);
    }

    #[test]
    fn test_build_full_one_sheet_per_schema_sheet() {
        let book = build(&small_schema(), &small_document(), OutputMethod::Full).unwrap();
        let names: Vec<&str> = book.sheets().iter().map(Worksheet::name).collect();
        assert_eq!(names, vec!["Documents", "Owner"]);

        let documents = book.sheet("Documents").unwrap();
        assert_eq!(documents.cell_value(1, 1), &CellValue::from(NO_HEADER));
        assert_eq!(documents.cell_value(2, 1), &CellValue::from("doc-1"));

        let owner = book.sheet("Owner").unwrap();
        assert_eq!(owner.cell_value(1, 1), &CellValue::from("Name"));
        assert_eq!(owner.cell_value(1, 2), &CellValue::from("Location"));
        assert_eq!(owner.cell_value(2, 1), &CellValue::from("Acme"));
        assert_eq!(owner.cell_value(3, 1), &CellValue::from(""));
    }

    #[test]
    fn test_build_styles_headers_and_data() {
        let book = build(&small_schema(), &small_document(), OutputMethod::Compact).unwrap();
        let sheet = &book.sheets()[0];
        assert_eq!(sheet.cell(1, 2).unwrap().style, CellStyle::HEADER);
        assert_eq!(sheet.cell(2, 2).unwrap().style, CellStyle::DATA);
        assert_eq!(sheet.column_width(3), Some(HEADER_COLUMN_WIDTH));
    }

    #[test]
    fn test_build_missing_column_reports_population_phase() {
        let document = json!({"Documents": [], "Owner": {"Name": ["Acme"]}});
        let err = build(&small_schema(), &document, OutputMethod::Full).unwrap_err();
        assert_eq!(err.phase(), Some(BuildPhase::Population));
        let msg = err.to_string();
        assert!(msg.contains("column 'Location'"), "Expected column in: {msg}");
    }

    #[test]
    fn test_build_misaligned_columns_rejected() {
        let document = json!({
            "Documents": [],
            "Owner": {"Name": ["Acme", "Brill"], "Location": ["Leiden"]}
        });
        let err = build(&small_schema(), &document, OutputMethod::Compact).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("has 1 values"), "Expected lengths in: {msg}");
        assert!(matches!(err, ConvertError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_build_headerless_sheet_requires_list() {
        let document = json!({"Documents": {"x": 1}, "Owner": {"Name": [], "Location": []}});
        let err = build(&small_schema(), &document, OutputMethod::Full).unwrap_err();
        assert!(err.to_string().contains("expected a list"));
    }

    #[test]
    fn test_build_rejects_non_object_root() {
        let err = build(&small_schema(), &json!([1, 2]), OutputMethod::Compact).unwrap_err();
        assert!(matches!(err, ConvertError::DocumentNotObject { found: "a list" }));
    }

    #[test]
    fn test_build_invalid_sheet_name_is_header_phase() {
        let schema = Schema::new(vec![SheetSpec::new("Bad/Name", ["A"])]).unwrap();
        let document = json!({"Bad/Name": {"A": [1]}});
        let err = build(&schema, &document, OutputMethod::Full).unwrap_err();
        assert_eq!(err.phase(), Some(BuildPhase::Header));
        // The compact sheet has a fixed name, so the same schema builds there.
        assert!(build(&schema, &document, OutputMethod::Compact).is_ok());
    }

    #[test]
    fn test_build_compact_column_count_matches_schema() {
        let schema = Schema::catalogue();
        let mut root = Map::new();
        for spec in schema.sheets() {
            let entry = if spec.is_headerless() {
                json!([1])
            } else {
                Value::Object(
                    spec.columns
                        .iter()
                        .map(|c| (c.clone(), json!(["v"])))
                        .collect(),
                )
            };
            root.insert(spec.name.clone(), entry);
        }
        let book = build(&schema, &Value::Object(root), OutputMethod::Compact).unwrap();
        let expected = u32::try_from(schema.data_column_count()).unwrap();
        assert_eq!(book.sheets()[0].max_column(), expected);
    }
}
