//! Linear interpolation of block-rate values inside the per-sample loop.
//!
//! The DSL compiler treats block-rate inputs as constant during a block and
//! hoists everything derived from them out of the sample loop into "slow"
//! values (`float fSlow0 = ...;`). For parameters declared interpolated, each
//! slow value derived from them is instead ramped from its previous block's
//! value to the new one:
//!
//! ```text
//! float fSlow0 = float(*amp_samps);
//! Sample fSlow0_incr = (fSlow0 - state->fSlow0_prev) * BL_RECIP;
//! Sample fSlow0_fast = state->fSlow0_prev;
//! state->fSlow0_prev = fSlow0;
//! for (int i0 = 0; (i0 < BL); i0 = (i0 + 1)) {
//!     fSlow0_fast += fSlow0_incr;
//!     *out_samps++ = FAUSTFLOAT(fSlow0_fast * ...);
//! }
//! ```
//!
//! Slow values are assigned once each, in dependency order, before the
//! loop, so one forward sweep finds every derived value.

use crate::scanner::{contains_ident, replace_ident};

const SLOW_PREFIX: &str = "fSlow";

/// A routine body after interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    /// Rewritten body.
    pub body: String,
    /// Slow values ramped; each needs a `<name>_prev` state field.
    pub slow_vars: Vec<String>,
}

/// Slow values whose definitions reference `names` or an earlier selected
/// slow value, in declaration order.
pub fn propagate(body: &str, names: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for line in body.lines() {
        if is_loop_start(line) {
            break;
        }
        let Some((var, expr)) = slow_definition(line) else {
            continue;
        };
        if selected.iter().any(|s| s == var) {
            continue;
        }
        let derived = names
            .iter()
            .chain(selected.iter())
            .any(|name| contains_ident(expr, name));
        if derived {
            selected.push(var.to_string());
        }
    }
    selected
}

/// Ramp every slow value derived from `names` across the block.
///
/// A body without a `for` loop is returned unchanged.
pub fn interpolate(body: &str, names: &[String]) -> Interpolated {
    let unchanged = || Interpolated {
        body: body.to_string(),
        slow_vars: Vec::new(),
    };
    if names.is_empty() {
        return unchanged();
    }

    let lines: Vec<&str> = body.lines().collect();
    let Some(loop_index) = lines.iter().position(|l| is_loop_start(l)) else {
        tracing::warn!("no sample loop to interpolate within");
        return unchanged();
    };

    let slow_vars = propagate(body, names);
    if slow_vars.is_empty() {
        tracing::debug!(?names, "no slow values derived from interpolated inputs");
        return unchanged();
    }
    tracing::debug!(?slow_vars, "interpolating slow values");

    let loop_line = lines[loop_index];
    let indent = &loop_line[..loop_line.len() - loop_line.trim_start().len()];
    let inner = format!("{indent}    ");

    let mut out: Vec<String> = lines[..loop_index].iter().map(|s| (*s).to_string()).collect();
    for var in &slow_vars {
        out.push(format!("{indent}Sample {var}_incr = ({var} - state->{var}_prev) * BL_RECIP;"));
        out.push(format!("{indent}Sample {var}_fast = state->{var}_prev;"));
        out.push(format!("{indent}state->{var}_prev = {var};"));
    }
    out.push(loop_line.to_string());
    for var in &slow_vars {
        out.push(format!("{inner}{var}_fast += {var}_incr;"));
    }
    for line in &lines[loop_index + 1..] {
        let mut line = (*line).to_string();
        for var in &slow_vars {
            line = replace_ident(&line, var, &format!("{var}_fast"));
        }
        out.push(line);
    }

    let mut body_out = out.join("\n");
    if body.ends_with('\n') {
        body_out.push('\n');
    }
    Interpolated {
        body: body_out,
        slow_vars,
    }
}

fn is_loop_start(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("for")
        .is_some_and(|rest| rest.starts_with([' ', '(']))
}

/// Split `float fSlowN = expr;` into `("fSlowN", "expr;")`.
fn slow_definition(line: &str) -> Option<(&str, &str)> {
    let (lhs, expr) = line.split_once('=')?;
    let var = lhs.split_whitespace().last()?;
    let is_slow = var.len() > SLOW_PREFIX.len()
        && var.starts_with(SLOW_PREFIX)
        && var[SLOW_PREFIX.len()..].bytes().all(|b| b.is_ascii_digit());
    is_slow.then_some((var, expr))
}
