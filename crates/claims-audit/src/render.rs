//! Plain-text rendering of an audit outcome.
//!
//! Each section is a titled table whose columns are padded by display width,
//! so names with wide characters stay aligned.

use std::fmt::Write as _;

use claims_core::formatting::{format_currency, format_number, format_optional, format_percent};
use claims_data::analysis::AuditOutcome;
use claims_data::report::AuditReport;
use claims_data::summary::ClaimsSummary;
use unicode_width::UnicodeWidthStr;

// ── Table ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

use Align::{Left, Right};

/// A titled text table built column by column.
struct TextTable {
    title: String,
    headers: Vec<(&'static str, Align)>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn new(title: impl Into<String>, headers: &[(&'static str, Align)]) -> Self {
        Self {
            title: title.into(),
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, (header, _))| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    fn render(&self) -> String {
        let widths = self.column_widths();
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", "=".repeat(self.title.width()));

        if self.rows.is_empty() {
            out.push_str("(none)\n");
            return out;
        }

        let header: Vec<String> = self.headers.iter().map(|(h, _)| h.to_string()).collect();
        out.push_str(&self.render_line(&header, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_line(row, &widths));
        }
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .zip(&self.headers)
            .map(|((cell, &width), (_, align))| pad(cell, width, *align))
            .collect();
        let mut line = padded.join("  ").trim_end().to_string();
        line.push('\n');
        line
    }
}

/// Pad `cell` with spaces up to `width` display columns.
fn pad(cell: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(cell.width()));
    match align {
        Align::Left => format!("{cell}{fill}"),
        Align::Right => format!("{fill}{cell}"),
    }
}

fn text(value: &Option<String>) -> String {
    format_optional(value.as_deref(), str::to_string)
}

fn pct(value: Option<f64>) -> String {
    format_optional(value, format_percent)
}

fn money(value: Option<f64>) -> String {
    format_optional(value, format_currency)
}

// ── Summary ───────────────────────────────────────────────────────────────────

fn render_summary(summary: &ClaimsSummary, out: &mut String) {
    out.push_str("Claims Overview\n===============\n");
    let _ = writeln!(out, "Claims:          {}", format_number(summary.total_claims as f64, 0));
    let _ = writeln!(out, "Total billed:    {}", format_currency(summary.total_billed));
    let _ = writeln!(out, "Total paid:      {}", format_currency(summary.total_paid));
    let _ = writeln!(out, "Mean billed:     {}", money(summary.mean_billed));
    let _ = writeln!(out, "Mean paid:       {}", money(summary.mean_paid));
    let _ = writeln!(out, "Approval rate:   {}", pct(summary.approval_rate));
    for count in &summary.status_counts {
        let label = format!("{} claims:", count.status.as_str());
        let _ = writeln!(out, "{label:<17}{}", format_number(count.claims as f64, 0));
    }
    out.push('\n');

    let mut patients = TextTable::new(
        "Top Patients by Claims",
        &[("Patient", Left), ("ID", Right), ("Claims", Right)],
    );
    for p in &summary.top_patients {
        patients.push(vec![text(&p.name), p.patient_id.to_string(), p.claims.to_string()]);
    }

    let mut providers = TextTable::new(
        "Top Providers by Claims",
        &[("Provider", Left), ("Specialty", Left), ("ID", Right), ("Claims", Right)],
    );
    for p in &summary.top_providers {
        providers.push(vec![
            text(&p.name),
            text(&p.specialty),
            p.provider_id.to_string(),
            p.claims.to_string(),
        ]);
    }

    let mut procedures = TextTable::new(
        "Top Procedures by Claims",
        &[("Procedure", Left), ("ID", Right), ("Claims", Right)],
    );
    for p in &summary.top_procedures {
        procedures.push(vec![
            text(&p.description),
            p.procedure_id.to_string(),
            p.claims.to_string(),
        ]);
    }

    let mut billed = TextTable::new(
        "Top Procedures by Total Billed",
        &[("Procedure", Left), ("Total Billed", Right)],
    );
    for p in &summary.top_billed_procedures {
        billed.push(vec![text(&p.description), format_currency(p.total_billed)]);
    }

    let mut share = TextTable::new(
        "Claim Share by Specialty",
        &[("Specialty", Left), ("Claims", Right), ("Share", Right)],
    );
    for s in &summary.specialty_share {
        share.push(vec![
            text(&s.specialty),
            s.claims.to_string(),
            format_percent(s.share_pct),
        ]);
    }

    let mut ages = TextTable::new(
        "Average Billed by Age Group",
        &[("Age Group", Left), ("Claims", Right), ("Mean Billed", Right)],
    );
    for a in &summary.age_group_costs {
        ages.push(vec![
            a.age_group.label().to_string(),
            a.claims.to_string(),
            format_currency(a.mean_billed),
        ]);
    }

    for table in [patients, providers, procedures, billed, share, ages] {
        out.push_str(&table.render());
        out.push('\n');
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

fn denial_columns(entity: &'static str) -> [(&'static str, Align); 5] {
    [
        (entity, Left),
        ("ID", Right),
        ("Claims", Right),
        ("Denied", Right),
        ("Denial Rate", Right),
    ]
}

fn render_report(report: &AuditReport, out: &mut String) {
    let mut high_denial = TextTable::new(
        "High-Denial Providers",
        &denial_columns("Provider"),
    );
    for r in &report.high_denial_providers {
        high_denial.push(vec![
            text(&r.name),
            r.provider_id.to_string(),
            r.total_claims.to_string(),
            r.denied_claims.to_string(),
            pct(r.denial_rate),
        ]);
    }

    let mut high_billed = TextTable::new(
        "High-Billed Patients",
        &[("Patient", Left), ("ID", Right), ("Claims", Right), ("Total Billed", Right)],
    );
    for p in &report.high_billed_patients {
        high_billed.push(vec![
            text(&p.name),
            p.patient_id.to_string(),
            p.total_claims.to_string(),
            format_currency(p.total_billed),
        ]);
    }

    let mut unusual = TextTable::new(
        "Unusual Procedures",
        &[("Procedure", Left), ("ID", Right), ("Median", Right), ("Mean", Right), ("Max", Right)],
    );
    for c in &report.unusual_procedures {
        unusual.push(vec![
            text(&c.description),
            c.procedure_id.to_string(),
            format_currency(c.median_billed),
            format_currency(c.mean_billed),
            format_currency(c.max_billed),
        ]);
    }

    let mut overcharging = TextTable::new(
        "Overcharging Providers",
        &[("Provider", Left), ("Specialty", Left), ("Flagged Billed", Right)],
    );
    for o in &report.overcharging_providers {
        overcharging.push(vec![
            text(&o.name),
            text(&o.specialty),
            format_currency(o.billed_amount),
        ]);
    }

    let mut specialty = TextTable::new(
        "Billing by Specialty",
        &[("Specialty", Left), ("Billed", Right)],
    );
    for s in &report.specialty_billing {
        specialty.push(vec![text(&s.specialty), format_currency(s.billed_amount)]);
    }

    let mut variation = TextTable::new(
        "High Cost-Variation Procedures",
        &[
            ("Procedure", Left),
            ("Mean", Right),
            ("Median", Right),
            ("Std", Right),
            ("Mean/Median", Right),
        ],
    );
    for v in &report.high_variation_procedures {
        variation.push(vec![
            text(&v.description),
            format_currency(v.mean),
            format_currency(v.median),
            money(v.std),
            format_optional(v.variability_ratio, |r| format_number(r, 2)),
        ]);
    }

    let mut provider_rates = TextTable::new(
        "Denial Rate by Provider",
        &denial_columns("Provider"),
    );
    for r in &report.provider_denial_rates {
        provider_rates.push(vec![
            text(&r.name),
            r.provider_id.to_string(),
            r.total_claims.to_string(),
            r.denied_claims.to_string(),
            pct(r.denial_rate),
        ]);
    }

    let mut procedure_rates = TextTable::new(
        "Denial Rate by Procedure",
        &denial_columns("Procedure"),
    );
    for r in &report.procedure_denial_rates {
        procedure_rates.push(vec![
            text(&r.description),
            r.procedure_id.to_string(),
            r.total_claims.to_string(),
            r.denied_claims.to_string(),
            pct(r.denial_rate),
        ]);
    }

    let _ = writeln!(
        out,
        "High-Billed Patient Threshold: {}",
        money(report.scalars.high_billed_threshold)
    );
    let _ = writeln!(out, "Overall Approval Rate: {}", pct(report.scalars.approval_rate));
    out.push('\n');

    for table in [
        high_denial,
        high_billed,
        unusual,
        overcharging,
        specialty,
        variation,
        provider_rates,
        procedure_rates,
    ] {
        out.push_str(&table.render());
        out.push('\n');
    }
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Render the summary, cleaning notes and every report section as text.
pub fn render_text(outcome: &AuditOutcome) -> String {
    let mut out = String::new();
    render_summary(&outcome.summary, &mut out);

    if let Some(cleaning) = &outcome.cleaning {
        if cleaning.total_fixes() > 0 || cleaning.total_malformed() > 0 {
            let _ = writeln!(
                out,
                "Data cleaning: {} fixes, {} malformed lines skipped\n",
                cleaning.total_fixes(),
                cleaning.total_malformed()
            );
        }
    }

    render_report(&outcome.report, &mut out);
    out.trim_end().to_string()
}

/// Pretty-printed JSON of the whole outcome.
pub fn render_json(outcome: &AuditOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
