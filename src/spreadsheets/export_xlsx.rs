use crate::domain::property::PropertyRecord;
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

const HEADERS: [&str; 14] = [
    "Address",
    "City",
    "State",
    "Zip",
    "Type",
    "Market Value",
    "Beds",
    "Baths",
    "Year Built",
    "Lot Area",
    "Building Area",
    "School Rating",
    "Condition",
    "Source",
];

/// Build the listing workbook in memory.
pub fn properties_workbook(properties: &[PropertyRecord]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).map_err(|e| {
            ServerError::XlsxError(format!("Failed to write header '{}': {}", header, e))
        })?;
    }

    for (i, property) in properties.iter().enumerate() {
        write_row(worksheet, (i + 1) as u32, property).map_err(|e| {
            ServerError::XlsxError(format!("Failed to write row for '{}': {}", property.address, e))
        })?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {}", e)))
}

fn write_row(ws: &mut Worksheet, r: u32, p: &PropertyRecord) -> Result<(), XlsxError> {
    ws.write_string(r, 0, &p.address)?;
    ws.write_string(r, 1, p.city.as_deref().unwrap_or(""))?;
    ws.write_string(r, 2, p.state.as_deref().unwrap_or(""))?;
    ws.write_string(r, 3, p.zip_code.as_deref().unwrap_or(""))?;
    ws.write_string(r, 4, p.property_type.as_str())?;
    match p.known_market_value() {
        Some(v) => ws.write_number(r, 5, v as f64)?,
        None => ws.write_string(r, 5, "")?,
    };
    ws.write_number(r, 6, p.bedrooms as f64)?;
    ws.write_number(r, 7, p.bathrooms as f64)?;
    ws.write_number(r, 8, p.year_built as f64)?;
    ws.write_number(r, 9, p.lot_area as f64)?;
    ws.write_number(r, 10, p.building_area as f64)?;
    ws.write_number(r, 11, p.school_rating as f64)?;
    ws.write_string(r, 12, p.condition.as_str())?;
    ws.write_string(r, 13, p.source.as_str())?;
    Ok(())
}

pub fn export_properties_xlsx(properties: &[PropertyRecord]) -> ResultResp {
    let buffer = properties_workbook(properties)?;
    xlsx_response(buffer, "properties.xlsx")
}
