//! Time-parameterized expressions for the media engine's expression evaluator.
//!
//! Everything here is pure string construction. Numbers are printed with three decimals so
//! the engine never sees exponent notation or long binary fractions.

use crate::foundation::format::fmt3;
use crate::timeline::model::{PositionAnim, RotationAnim, ScaleAnim};

/// Clamped linear ramp from `from` to `to` over `[start, start + duration)` in `time_var`.
///
/// `time_var` may itself be an expression such as `(t-2.000)`. A non-positive duration
/// collapses to the constant `from`.
pub fn linear(time_var: &str, start: f64, duration: f64, from: f64, to: f64) -> String {
    if duration <= 0.0 {
        return fmt3(from);
    }
    let end = start + duration;
    let (s, d, f, t) = (fmt3(start), fmt3(duration), fmt3(from), fmt3(to));
    format!(
        "if(lt({time_var},{s}),{f},if(gte({time_var},{e}),{t},{f}+({t}-{f})*(({time_var}-{s})/{d})))",
        e = fmt3(end),
    )
}

/// Numeric twin of [`linear`], evaluated at `t`.
pub fn sample_linear(t: f64, start: f64, duration: f64, from: f64, to: f64) -> f64 {
    if duration <= 0.0 || t < start {
        return from;
    }
    if t >= start + duration {
        return to;
    }
    from + (to - from) * ((t - start) / duration)
}

/// Engine time relative to a layer that appears at `start` seconds.
pub fn local_time(start: f64) -> String {
    if start > 0.0 {
        format!("(t-{})", fmt3(start))
    } else {
        "t".to_owned()
    }
}

/// `(x, y)` expressions for a position ramp.
pub fn position_exprs(anim: &PositionAnim, time_var: &str) -> (String, String) {
    (
        linear(time_var, anim.start, anim.duration, anim.from_x, anim.to_x),
        linear(time_var, anim.start, anim.duration, anim.from_y, anim.to_y),
    )
}

/// Rotation angle expression in radians.
pub fn rotation_expr(anim: &RotationAnim, time_var: &str) -> String {
    linear(
        time_var,
        anim.start,
        anim.duration,
        anim.from_deg.to_radians(),
        anim.to_deg.to_radians(),
    )
}

pub fn scale_expr(anim: &ScaleAnim, time_var: &str) -> String {
    linear(time_var, anim.start, anim.duration, anim.from, anim.to)
}

/// Piecewise alpha for a layer visible in `[start, end)` with optional fades.
///
/// Returns `"1"` when neither fade is set.
pub fn fade_alpha(start: f64, end: f64, fade_in: f64, fade_out: f64) -> String {
    let (s, e) = (fmt3(start), fmt3(end));
    let fade_in_end = fmt3(start + fade_in);
    let fade_out_start = fmt3(end - fade_out);
    match (fade_in > 0.0, fade_out > 0.0) {
        (true, true) => format!(
            "if(lt(t,{s}),0,if(lt(t,{fade_in_end}),(t-{s})/{fi},if(lt(t,{fade_out_start}),1,if(lt(t,{e}),({e}-t)/{fo},0))))",
            fi = fmt3(fade_in),
            fo = fmt3(fade_out),
        ),
        (true, false) => format!(
            "if(lt(t,{s}),0,if(lt(t,{fade_in_end}),(t-{s})/{fi},1))",
            fi = fmt3(fade_in),
        ),
        (false, true) => format!(
            "if(lt(t,{fade_out_start}),1,if(lt(t,{e}),({e}-t)/{fo},0))",
            fo = fmt3(fade_out),
        ),
        (false, false) => "1".to_owned(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/linear.rs"]
mod tests;
