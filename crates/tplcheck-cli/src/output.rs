use tplcheck_runner::CaseReport;

/// Render one case as human-readable text.
pub fn render_report(report: &CaseReport) -> String {
    let status = if report.passed() { "PASS" } else { "FAIL" };
    let elapsed = (report.finished_at - report.started_at).num_seconds();
    let mut out = format!("{} {} (run {}, {}s)\n", status, report.case, report.run_id, elapsed);

    if let Some(t) = &report.template {
        out.push_str(&format!("  template: {}\n", t));
    }
    if let Some(e) = &report.error {
        out.push_str(&format!("  error: {}\n", e));
    }
    for a in &report.assertions {
        out.push_str(&format!("  {}\n", a));
    }
    if let Some(e) = &report.teardown_error {
        out.push_str(&format!("  teardown: {}\n", e));
    }
    out
}

/// One-line tally across cases.
pub fn render_summary(reports: &[CaseReport]) -> String {
    let passed = reports.iter().filter(|r| r.passed()).count();
    format!("{} passed, {} failed", passed, reports.len() - passed)
}
