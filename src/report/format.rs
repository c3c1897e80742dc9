//! Formatted terminal output for a fit run.
//!
//! We keep formatting code in one place so the fitting code stays clean and
//! output changes are localized.

use crate::domain::{AscFit, CandidateSummary, FitConfig};

/// Format the full run summary (configuration, candidate table, per-sweep estimates).
pub fn format_fit_summary(fit: &AscFit, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== asglm - after-spike current fit ===\n");
    out.push_str(&format!(
        "Mode: {} | basis: {:?} | dt={:e}s | npcut={} | nkt={} | start={}\n",
        fit.mode, config.basis, config.dt, config.npcut, config.filter_len, config.start
    ));
    out.push_str(&format!(
        "Seeds: C={:.3}pF | tau={:.3}ms | El={:.3}mV\n",
        config.seeds.capacitance * 1e12,
        config.seeds.time_constant * 1e3,
        config.seeds.resting_potential * 1e3,
    ));
    out.push_str(&format!(
        "Sweeps: n={} | candidate pairs: n={}\n",
        fit.log_likelihoods.len(),
        fit.candidates.len()
    ));

    out.push_str("\nCandidate diagnostics:\n");
    out.push_str(&format_candidates(&fit.candidates, fit.best_index));

    out.push_str("\nChosen pair:\n");
    out.push_str(&format!(
        "- k = [{:.3}, {:.3}] 1/s (index {})\n",
        fit.best_rates[0], fit.best_rates[1], fit.best_index
    ));
    out.push('\n');

    out.push_str("Per-sweep estimates:\n");
    out.push_str(&format_sweeps(fit));

    out
}

fn format_candidates(rows: &[CandidateSummary], best: usize) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("  {:>5} {:>10} {:>10} {:>14} {:>8}", "index", "k1", "k2", "mean_llf", "failed"),
    );
    for c in rows {
        let chosen = if c.index == best { "*" } else { " " };
        push_line(
            &mut out,
            format!(
                "{chosen} {:>5} {:>10.3} {:>10.3} {:>14} {:>8}",
                c.index,
                c.rates[0],
                c.rates[1],
                fmt_f(c.mean_log_likelihood, 3),
                c.failures
            ),
        );
    }
    out
}

fn format_sweeps(fit: &AscFit) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>14}",
            "sweep", "amp1[pA]", "amp2[pA]", "R[MOhm]", "C[pF]", "El[mV]", "llf"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:->5} {:->10} {:->10} {:->10} {:->10} {:->10} {:->14}",
            "", "", "", "", "", "", ""
        ),
    );

    for (i, amps) in fit.amplitudes.iter().enumerate() {
        let c = fit.capacitances.get(i).copied().flatten();
        let el = fit.reversal_potentials.get(i).copied().flatten();
        push_line(
            &mut out,
            format!(
                "{:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>14}",
                i,
                fmt_f(amps[0] * 1e12, 3),
                fmt_f(amps[1] * 1e12, 3),
                fmt_f(fit.resistances[i] * 1e-6, 3),
                c.map(|v| fmt_f(v * 1e12, 3)).unwrap_or_else(|| "-".to_string()),
                el.map(|v| fmt_f(v * 1e3, 3)).unwrap_or_else(|| "-".to_string()),
                fmt_f(fit.log_likelihoods[i], 3),
            ),
        );
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_f(v: f64, decimals: usize) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.decimals$}")
    }
}
