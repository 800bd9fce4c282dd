use crate::errors::AppResult;
use crate::models::Lead;
use rust_xlsxwriter::{Format, Workbook};

pub const QUALIFIED_SHEET_NAME: &str = "Qualified Contacts";
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const EXPORT_HEADERS: [&str; 10] = [
    "id",
    "tax_id",
    "name",
    "state",
    "city",
    "phone",
    "email",
    "social_handle",
    "crop",
    "stage",
];

/// Single-sheet workbook: one header row, then one row per lead in the given order.
pub fn leads_workbook(leads: &[Lead]) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(QUALIFIED_SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, lead) in leads.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_number(row, 0, lead.id as f64)?;
        let text_cells = [
            lead.tax_id.as_str(),
            lead.name.as_str(),
            lead.state.as_str(),
            lead.city.as_str(),
            lead.phone.as_str(),
            lead.email.as_str(),
            lead.social_handle.as_str(),
            lead.crop.as_str(),
            lead.stage.as_str(),
        ];
        for (offset, value) in text_cells.iter().enumerate() {
            worksheet.write_string(row, offset as u16 + 1, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::{leads_workbook, EXPORT_HEADERS, QUALIFIED_SHEET_NAME};
    use crate::models::{Lead, Stage};
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn qualified(id: i64, name: &str) -> Lead {
        Lead {
            id,
            tax_id: "12.345".to_string(),
            name: name.to_string(),
            state: "SP".to_string(),
            city: "Campinas".to_string(),
            phone: "1199".to_string(),
            email: "a@farm.test".to_string(),
            social_handle: "@farm".to_string(),
            crop: "soy".to_string(),
            stage: Stage::QualifiedContact,
        }
    }

    #[test]
    fn workbook_has_header_and_one_row_per_lead() {
        let bytes = leads_workbook(&[qualified(3, "Farm A"), qualified(8, "Farm C")]).expect("workbook");
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).expect("open");
        assert_eq!(workbook.sheet_names(), vec![QUALIFIED_SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(QUALIFIED_SHEET_NAME).expect("sheet");
        assert_eq!(range.height(), 3);
        assert_eq!(range.width(), EXPORT_HEADERS.len());
        for (col, header) in EXPORT_HEADERS.iter().enumerate() {
            assert_eq!(range.get((0, col)), Some(&Data::String(header.to_string())));
        }
        assert_eq!(range.get((1, 0)), Some(&Data::Float(3.0)));
        assert_eq!(range.get((2, 2)), Some(&Data::String("Farm C".to_string())));
        assert_eq!(range.get((2, 9)), Some(&Data::String("QualifiedContact".to_string())));
    }

    #[test]
    fn empty_export_still_writes_the_header() {
        let bytes = leads_workbook(&[]).expect("workbook");
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).expect("open");
        let range = workbook.worksheet_range(QUALIFIED_SHEET_NAME).expect("sheet");
        assert_eq!(range.height(), 1);
    }
}
