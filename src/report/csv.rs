//! CSV report output

use crate::status::ResultRow;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, rows: &[ResultRow]) -> io::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(["image_id", "condition", "label", "raw_status"])?;
    for r in rows {
        let condition = r.badge.condition.to_string();
        csv.write_record([
            r.image_id.as_str(),
            condition.as_str(),
            r.badge.label.as_str(),
            r.raw_status.as_str(),
        ])?;
    }

    csv.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::classify;

    #[test]
    fn test_csv_header_and_rows() {
        let rows = vec![
            ResultRow { image_id: "a1".into(), raw_status: "LOW".into(), badge: classify("LOW") },
            ResultRow { image_id: "a,2".into(), raw_status: "".into(), badge: classify("") },
        ];
        let mut out = Vec::new();
        write(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "image_id,condition,label,raw_status");
        assert_eq!(lines[1], "a1,good,양호,LOW");
        // Embedded comma gets quoted
        assert_eq!(lines[2], "\"a,2\",unknown,—,");
    }
}
