//! HTML report: summary tiles plus the badge table

use crate::report::Summary;
use crate::status::{Condition, ResultRow};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, rows: &[ResultRow]) -> io::Result<()> {
    let summary = Summary::from_rows(rows);
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    let body: String = rows.iter().map(table_row).collect();

    write!(writer, r#"<!DOCTYPE html>
<html lang="ko">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Turf Analysis Results</title>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --good: #3fb950;
            --warn: #d29922;
            --bad: #f85149;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans KR', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 960px; margin: 0 auto; padding: 2rem; }}
        h1 {{ font-size: 1.75rem; margin-bottom: 0.25rem; }}
        .subtitle {{ color: var(--dim); margin-bottom: 2rem; }}
        .stats {{
            display: grid;
            grid-template-columns: repeat(4, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.25rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 2.5rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.875rem; text-transform: uppercase; margin-top: 0.5rem; }}
        .stat.good .stat-value {{ color: var(--good); }}
        .stat.warn .stat-value {{ color: var(--warn); }}
        .stat.bad .stat-value {{ color: var(--bad); }}
        table {{ width: 100%; border-collapse: collapse; background: var(--card); border-radius: 12px; overflow: hidden; }}
        th, td {{ padding: 0.75rem 1rem; border-bottom: 1px solid var(--border); text-align: left; }}
        th {{ color: var(--dim); font-weight: 600; }}
        .badge {{ display: inline-block; padding: 0.15rem 0.6rem; border-radius: 999px; border: 1px solid var(--border); }}
        .badge.good {{ color: var(--good); border-color: var(--good); }}
        .badge.warn {{ color: var(--warn); border-color: var(--warn); }}
        .badge.bad {{ color: var(--bad); border-color: var(--bad); }}
        .empty {{ color: var(--dim); text-align: center; padding: 2rem; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Turf Analysis Results</h1>
        <div class="subtitle">Generated {generated}</div>
        <div class="stats">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Total</div></div>
            <div class="stat good"><div class="stat-value">{good}</div><div class="stat-label">양호</div></div>
            <div class="stat warn"><div class="stat-value">{warn}</div><div class="stat-label">주의</div></div>
            <div class="stat bad"><div class="stat-value">{bad}</div><div class="stat-label">불량</div></div>
        </div>
        <table>
            <thead><tr><th>Image</th><th>Status</th></tr></thead>
            <tbody>
{body}            </tbody>
        </table>
    </div>
</body>
</html>
"#,
        generated = generated,
        total = summary.total,
        good = summary.good,
        warn = summary.warn,
        bad = summary.bad,
        body = if rows.is_empty() {
            "                <tr><td colspan=\"2\" class=\"empty\">No results yet</td></tr>\n".to_string()
        } else {
            body
        },
    )?;

    Ok(())
}

fn table_row(row: &ResultRow) -> String {
    let class = match row.badge.condition {
        Condition::Good => "badge good",
        Condition::Warn => "badge warn",
        Condition::Bad => "badge bad",
        Condition::Unknown => "badge",
    };
    format!(
        "                <tr><td>{}</td><td><span class=\"{}\">{} {}</span></td></tr>\n",
        html_escape(&row.image_id),
        class,
        row.badge.icon,
        html_escape(&row.badge.label)
    )
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::classify;

    fn render(rows: &[ResultRow]) -> String {
        let mut out = Vec::new();
        write(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_html_badges_and_counts() {
        let rows = vec![
            ResultRow { image_id: "a1".into(), raw_status: "양호".into(), badge: classify("양호") },
            ResultRow { image_id: "a2".into(), raw_status: "HIGH".into(), badge: classify("HIGH") },
        ];
        let html = render(&rows);

        assert!(html.contains(r#"<span class="badge good">✅ 양호</span>"#));
        assert!(html.contains(r#"<span class="badge bad">🚫 불량</span>"#));
        assert!(html.contains(r#"<div class="stat-value">2</div><div class="stat-label">Total</div>"#));
    }

    #[test]
    fn test_html_escapes_backend_text() {
        let rows = vec![ResultRow {
            image_id: "<script>alert(1)</script>".into(),
            raw_status: "a & b".into(),
            badge: classify("a & b"),
        }];
        let html = render(&rows);

        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_html_empty_placeholder() {
        assert!(render(&[]).contains("No results yet"));
    }
}
