//! CSV出力

use crate::error::Result;
use medprice_common::ResultRow;
use std::fs::File;
use std::path::Path;

pub const HEADER: [&str; 8] = [
    "index",
    "raw_name",
    "found_name",
    "price",
    "score",
    "tier",
    "product_url",
    "error",
];

fn option_to_csv<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_rows<W: std::io::Write>(rows: &[ResultRow], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    for row in rows {
        writer.write_record([
            row.index.to_string(),
            row.raw_name.clone(),
            option_to_csv(&row.found_name),
            option_to_csv(&row.price),
            format!("{:.2}", row.score),
            row.tier.label().to_string(),
            option_to_csv(&row.product_url),
            option_to_csv(&row.error),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn generate_csv(rows: &[ResultRow], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    write_rows(rows, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use medprice_common::ConfidenceTier;
    use std::str::FromStr;

    #[test]
    fn test_write_rows() {
        let rows = vec![
            ResultRow {
                index: 0,
                raw_name: "dolo 650".into(),
                found_name: Some("Dolo 650 Tablet 15's".into()),
                price: Some(BigDecimal::from_str("33.60").unwrap()),
                score: 1.0,
                tier: ConfidenceTier::Exact,
                product_url: Some("https://www.1mg.com/drugs/dolo-650-tablet-74467".into()),
                error: None,
            },
            ResultRow {
                index: 1,
                raw_name: "xyz, 10mg".into(),
                found_name: None,
                price: None,
                score: 0.0,
                tier: ConfidenceTier::NotFound,
                product_url: None,
                error: Some("レート制限 (4回試行)".into()),
            },
        ];

        let mut buffer = Vec::new();
        write_rows(&rows, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "index,raw_name,found_name,price,score,tier,product_url,error");
        assert_eq!(
            lines[1],
            "0,dolo 650,Dolo 650 Tablet 15's,33.60,1.00,exact,https://www.1mg.com/drugs/dolo-650-tablet-74467,"
        );
        assert_eq!(lines[2], "1,\"xyz, 10mg\",,,0.00,not_found,,レート制限 (4回試行)");
    }
}
