use crate::errors::{AppError, AppResult};
use crate::models::NewLead;
use std::io::Read;

/// Header names that map onto a lead column, canonical and legacy.
const KNOWN_HEADERS: &[&str] = &[
    "tax_id",
    "name",
    "state",
    "city",
    "phone",
    "email",
    "social_handle",
    "crop",
    "cnpj",
    "nome",
    "estado",
    "cidade",
    "telefone",
    "rede_social",
    "cultivo",
];

/// Parses the whole upload before anything is written, so a bad row rejects the file.
pub fn parse_leads_csv<R: Read>(reader: R) -> AppResult<Vec<NewLead>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|header| KNOWN_HEADERS.contains(&header)) {
        return Err(AppError::Csv(format!(
            "header row has no lead columns (got: {})",
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut leads = Vec::new();
    for (index, record) in reader.deserialize::<NewLead>().enumerate() {
        let lead = record.map_err(|error| AppError::Csv(format!("row {}: {}", index + 1, error)))?;
        leads.push(lead);
    }
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::parse_leads_csv;

    #[test]
    fn canonical_headers_parse_and_stage_column_is_dropped() {
        let data = "tax_id,name,state,city,phone,email,social_handle,crop,stage\n\
                    12.345,Farm A,SP,Campinas,1199,a@farm.test,@farma,soy,QualifiedContact\n";
        let leads = parse_leads_csv(data.as_bytes()).expect("parse");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].tax_id, "12.345");
        assert_eq!(leads[0].name, "Farm A");
        assert_eq!(leads[0].social_handle, "@farma");
    }

    #[test]
    fn legacy_portuguese_headers_are_accepted() {
        let data = "cnpj,nome,estado,cidade,telefone,email,rede_social,cultivo,etapa\n\
                    98.765,Farm B,MG,Uberlandia,3499,b@farm.test,,corn,Em andamento\n";
        let leads = parse_leads_csv(data.as_bytes()).expect("parse");
        assert_eq!(leads[0].state, "MG");
        assert_eq!(leads[0].crop, "corn");
        assert_eq!(leads[0].social_handle, "");
    }

    #[test]
    fn missing_columns_become_empty_and_unknown_ones_are_ignored() {
        let data = "name,crop,notes\nFarm C,coffee,call after harvest\n";
        let leads = parse_leads_csv(data.as_bytes()).expect("parse");
        assert_eq!(leads[0].name, "Farm C");
        assert_eq!(leads[0].email, "");
    }

    #[test]
    fn ragged_rows_reject_the_whole_file() {
        let data = "name,state,crop\nFarm A,SP,soy\nFarm B,MG\n";
        let error = parse_leads_csv(data.as_bytes()).expect_err("ragged row");
        assert!(error.to_string().starts_with("CSV_INVALID"));
    }

    #[test]
    fn header_without_lead_columns_is_rejected() {
        let error = parse_leads_csv("foo,bar\n1,2\n".as_bytes()).expect_err("no lead columns");
        assert!(error.to_string().contains("no lead columns"));
    }
}
