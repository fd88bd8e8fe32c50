//! HTML score report generator.
//!
//! Produces a self-contained HTML file with all CSS and SVG charts inlined.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use studyfocus_core::model::Subject;
use studyfocus_core::recommend::{OpportunityRow, RecommendationRow};
use studyfocus_core::report::{ScoreReport, SubjectSection};
use studyfocus_core::trends::TrendPoint;
use studyfocus_core::weights::{heaviest, ConceptWeight};

/// Name of the index page listing every generated report.
pub const INDEX_FILE: &str = "index.html";

const PALETTE: [&str; 6] = ["#2563eb", "#dc2626", "#16a34a", "#d97706", "#7c3aed", "#0891b2"];

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML page from a score report.
pub fn generate_html(report: &ScoreReport) -> String {
    let mut html = String::new();
    let name = html_escape(&report.student.display_name());

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Score report: {} ({})</title>\n",
        name,
        html_escape(&report.test_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Navigation
    html.push_str("<nav>\n");
    for section in &report.sections {
        html.push_str(&format!(
            "<a href=\"#{}\">{}</a>\n",
            section.subject,
            html_escape(&section.title)
        ));
    }
    html.push_str("</nav>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{name}</h1>\n"));
    html.push_str(&format!(
        "<p class=\"meta\">Test: <strong>{}</strong>",
        html_escape(&report.test_id)
    ));
    if let Some(last) = &report.last_test_id {
        html.push_str(&format!(" | Tracking: {}", html_escape(last)));
    }
    html.push_str(&format!(
        " | Student #{} | {}</p>\n",
        report.student.id,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    for section in &report.sections {
        html.push_str(&render_section(section));
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

fn render_section(section: &SubjectSection) -> String {
    let mut html = format!(
        "<section class=\"subject\" id=\"{}\">\n<h2>{}</h2>\n",
        section.subject,
        html_escape(&section.title)
    );

    html.push_str("<div class=\"focus\">\n<h3>Focus Concepts</h3>\n");
    html.push_str(&focus_table(&section.focus));
    if !section.trend.is_empty() {
        html.push_str(&generate_trend_chart(&section.trend));
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"side-by-side\">\n");
    html.push_str("<div>\n<h3>Opportunity Concepts</h3>\n");
    html.push_str(&opportunity_table(&section.opportunity));
    html.push_str("</div>\n");
    html.push_str("<div>\n<h3>Careless Errors</h3>\n");
    html.push_str(&opportunity_table(&section.careless));
    html.push_str("</div>\n</div>\n");

    html.push_str("</section>\n");
    html
}

fn focus_table(rows: &[RecommendationRow]) -> String {
    if rows.is_empty() {
        return "<p class=\"empty\">No recommendations</p>\n".to_string();
    }
    let mut html = String::from("<table>\n");
    html.push_str(
        "<thead><tr><th>Concept</th><th>Weight</th><th>Wrong</th><th>Score</th><th>Class Avg</th><th>Difference</th></tr></thead>\n",
    );
    html.push_str("<tbody>\n");
    for r in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{:.2}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td class=\"{}\">{:.2}</td></tr>\n",
            html_escape(&r.concept),
            r.weight,
            r.wrong,
            r.score,
            r.class_avg,
            if r.score_diff < 0.0 { "fail" } else { "pass" },
            r.score_diff,
        ));
    }
    html.push_str("</tbody></table>\n");
    html
}

fn opportunity_table(rows: &[OpportunityRow]) -> String {
    if rows.is_empty() {
        return "<p class=\"empty\">No recommendations</p>\n".to_string();
    }
    let mut html = String::from("<table>\n");
    html.push_str(
        "<thead><tr><th>Concept</th><th>Questions</th><th>Wrong</th><th>Score</th></tr></thead>\n",
    );
    html.push_str("<tbody>\n");
    for r in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
            html_escape(&r.concept),
            r.num_questions,
            r.num_wrong,
            r.score,
        ));
    }
    html.push_str("</tbody></table>\n");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ScoreReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Append a link to `href` to the index page in `dir`, creating the page on
/// first use.
pub fn append_index(dir: &Path, href: &str, label: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(INDEX_FILE);
    let fresh = !path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open index {}", path.display()))?;
    if fresh {
        file.write_all(
            b"<!DOCTYPE html>\n<meta charset=\"utf-8\">\n<title>Score reports</title>\n<h1>Score reports</h1>\n",
        )?;
    }
    writeln!(
        file,
        "<a href=\"{}\">{}</a><br>",
        html_escape(href),
        html_escape(label)
    )?;
    Ok(())
}

/// SVG horizontal bar chart of the `top_n` heaviest concepts of `subject`.
pub fn generate_weight_chart(weights: &[ConceptWeight], subject: Subject, top_n: usize) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 220;

    let rows = heaviest(weights, subject, top_n);
    let max_weight = rows.first().map_or(1.0, |w| w.weight).max(f64::EPSILON);
    let total_height = rows.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg class=\"weights\" width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, w) in rows.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (w.weight / max_weight * max_width as f64) as usize;

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&w.concept)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"3\"/>\n",
            label_width, y, width, bar_height, PALETTE[0]
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.2}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            w.weight
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// SVG line chart of concept scores over test dates, one line per concept.
pub fn generate_trend_chart(points: &[TrendPoint]) -> String {
    let width = 520.0;
    let height = 220.0;
    let left = 40.0;
    let right = 140.0;
    let top = 15.0;
    let bottom = 30.0;
    let plot_w = width - left - right;
    let plot_h = height - top - bottom;

    let mut dates: Vec<NaiveDate> = points.iter().map(|p| p.test_date).collect();
    dates.sort();
    dates.dedup();

    let mut lines: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for p in points {
        lines.entry(p.concept.as_str()).or_default().push((p.test_date, p.score));
    }

    let x_of = |date: NaiveDate| -> f64 {
        let i = dates.iter().position(|d| *d == date).unwrap_or(0);
        if dates.len() <= 1 {
            left + plot_w / 2.0
        } else {
            left + plot_w * i as f64 / (dates.len() - 1) as f64
        }
    };
    let y_of = |score: f64| -> f64 { top + plot_h * (1.0 - score.clamp(0.0, 1.0)) };

    let mut svg = format!(
        "<svg class=\"trend\" width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">\n"
    );

    // axes and gridlines at 0, 0.5, 1
    for tick in [0.0, 0.5, 1.0] {
        let y = y_of(tick);
        svg.push_str(&format!(
            "  <line x1=\"{left}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#9ca3af\" stroke-width=\"0.5\"/>\n",
            left + plot_w
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{y:.1}\" font-size=\"11\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{tick:.1}</text>\n",
            left - 6.0
        ));
    }
    for date in &dates {
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" fill=\"currentColor\" text-anchor=\"middle\">{}</text>\n",
            x_of(*date),
            height - 8.0,
            date.format("%m/%d/%y")
        ));
    }

    for (i, (concept, mut series)) in lines.into_iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        series.sort_by_key(|(d, _)| *d);
        let coords: Vec<String> = series
            .iter()
            .map(|(d, s)| format!("{:.1},{:.1}", x_of(*d), y_of(*s)))
            .collect();
        svg.push_str(&format!(
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
            coords.join(" ")
        ));
        for (d, s) in &series {
            svg.push_str(&format!(
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\" fill=\"{color}\"/>\n",
                x_of(*d),
                y_of(*s)
            ));
        }
        let legend_y = top + 16.0 * i as f64;
        svg.push_str(&format!(
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"10\" height=\"10\" fill=\"{color}\"/>\n",
            left + plot_w + 12.0,
            legend_y
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" fill=\"currentColor\" dominant-baseline=\"hanging\">{}</text>\n",
            left + plot_w + 26.0,
            legend_y,
            html_escape(concept)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 0 2rem 2rem; background: var(--bg); color: var(--fg); }
nav { position: sticky; top: 0; padding: 0.75rem 0; background: var(--bg); border-bottom: 1px solid var(--border); }
nav a { margin-right: 1.5rem; color: inherit; font-weight: bold; text-decoration: none; }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.side-by-side { display: flex; gap: 2rem; flex-wrap: wrap; }
.side-by-side > div { flex: 1; min-width: 280px; }
.empty { font-style: italic; color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.4rem 0.8rem; text-align: left; }
th { background: var(--border); }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 2rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use studyfocus_core::model::Student;

    fn trend(test: &str, day: u32, concept: &str, score: f64) -> TrendPoint {
        TrendPoint {
            test_id: test.into(),
            test_date: NaiveDate::from_ymd_opt(2015, 7, day).unwrap(),
            concept: concept.into(),
            score,
        }
    }

    fn make_test_report() -> ScoreReport {
        ScoreReport {
            id: uuid::Uuid::nil(),
            created_at: chrono::Utc::now(),
            student: Student {
                id: 3,
                identity: vec!["Ann".into(), "O'Lee".into()],
            },
            test_id: "YL_2".into(),
            last_test_id: Some("YL_1".into()),
            sections: vec![
                SubjectSection {
                    subject: Subject::Math,
                    title: "Math".into(),
                    focus: vec![RecommendationRow {
                        subject: Subject::Math,
                        concept: "ratios & rates".into(),
                        weight: 0.25,
                        wrong: 6,
                        score: 0.4,
                        class_avg: 0.7333333,
                        score_diff: -0.3333333,
                        weighted_score_diff: -0.0833333,
                    }],
                    opportunity: vec![OpportunityRow {
                        subject: Subject::Math,
                        concept: "algebra".into(),
                        num_questions: 10,
                        num_correct: 4,
                        num_wrong: 6,
                        score: 0.4,
                    }],
                    careless: vec![],
                    trend: vec![
                        trend("YL_1", 1, "ratios & rates", 0.2),
                        trend("YL_2", 8, "ratios & rates", 0.4),
                    ],
                },
                SubjectSection {
                    subject: Subject::Reading,
                    title: "Reading Comprehension".into(),
                    focus: vec![],
                    opportunity: vec![],
                    careless: vec![],
                    trend: vec![],
                },
            ],
        }
    }

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_test_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<a href=\"#math\">Math</a>"));
        assert!(html.contains("Reading Comprehension"));
        assert!(html.contains("YL_2"));
        assert!(html.contains("<polyline"));
    }

    #[test]
    fn html_escapes_text_and_rounds_numbers() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("ratios &amp; rates"));
        assert!(html.contains("O&#x27;Lee"));
        assert!(!html.contains("ratios & rates"));
        assert!(html.contains("<td>0.73</td>"));
        assert!(html.contains("-0.33"));
        assert!(!html.contains("0.7333333</td>"));
    }

    #[test]
    fn empty_tables_show_notice() {
        let html = generate_html(&make_test_report());
        // careless list of math plus three empty reading tables
        assert_eq!(html.matches("No recommendations").count(), 4);
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("YL_2").join("report.html");

        write_html_report(&report, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }

    #[test]
    fn index_is_created_then_appended() {
        let dir = tempfile::tempdir().unwrap();
        append_index(dir.path(), "YL_2/Ann_Lee_0_YL_2.html", "Ann Lee").unwrap();
        append_index(dir.path(), "YL_2/Bob_Ray_1_YL_2.html", "Bob Ray").unwrap();

        let index = std::fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        assert_eq!(index.matches("<h1>").count(), 1);
        assert!(index.contains("<a href=\"YL_2/Ann_Lee_0_YL_2.html\">Ann Lee</a><br>"));
        assert!(index.find("Ann Lee").unwrap() < index.find("Bob Ray").unwrap());
    }

    #[test]
    fn weight_chart_shows_heaviest_concepts() {
        let weight = |concept: &str, w: f64| ConceptWeight {
            subject: Subject::Math,
            concept: concept.into(),
            mean_questions: w * 10.0,
            weight: w,
        };
        let weights = vec![
            weight("algebra", 0.5),
            weight("geometry", 0.3),
            weight("ratios", 0.2),
        ];
        let svg = generate_weight_chart(&weights, Subject::Math, 2);
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("algebra"));
        assert!(svg.contains("0.30"));
        assert!(!svg.contains("ratios"));

        let none = generate_weight_chart(&weights, Subject::Reading, 2);
        assert!(!none.contains("<rect"));
    }

    #[test]
    fn trend_chart_draws_one_line_per_concept() {
        let points = vec![
            trend("T1", 1, "algebra", 0.5),
            trend("T2", 8, "algebra", 1.0),
            trend("T1", 1, "geometry", 0.0),
        ];
        let svg = generate_trend_chart(&points);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("07/01/15"));
        assert!(svg.contains("07/08/15"));
    }
}
