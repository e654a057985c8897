//! Assertion helpers with diagnostic output.
//!
//! Every failure names the context it was called with plus expected and
//! actual values.

use anvil_types::{Body, Mesh};
use feature_engine::RebuildReport;

use crate::helpers::{mesh_bounding_box, mesh_volume, HarnessError};

/// Assert the mesh bounding box matches expected values within tolerance.
pub fn assert_bounding_box(
    mesh: &Mesh,
    expected_min: [f32; 3],
    expected_max: [f32; 3],
    tol: f32,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (actual_min, actual_max) = mesh_bounding_box(mesh);

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box min[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_min[i], actual_min[i], tol,
                ),
            });
        }
        if (actual_max[i] - expected_max[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box max[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_max[i], actual_max[i], tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert the signed mesh volume within tolerance.
pub fn assert_volume(mesh: &Mesh, expected: f64, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    let actual = mesh_volume(mesh);
    if (actual - expected).abs() <= tol {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] volume: expected {:.4}, got {:.4} (tol={})",
                ctx, expected, actual, tol
            ),
        })
    }
}

/// Assert the body's features as (name, label) pairs, in order.
pub fn assert_feature_structure(body: &Body, expected: &[(&str, &str)]) -> Result<(), HarnessError> {
    let actual: Vec<(String, String)> = body
        .features
        .iter()
        .map(|f| (f.name.clone(), f.operation.label()))
        .collect();

    if actual.len() != expected.len() {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "feature count mismatch in {}: expected {}, got {}.\nActual: {:?}",
                body.name,
                expected.len(),
                actual.len(),
                actual,
            ),
        });
    }

    for (i, ((act_name, act_label), (exp_name, exp_label))) in
        actual.iter().zip(expected.iter()).enumerate()
    {
        if act_name != exp_name || act_label != exp_label {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "feature mismatch at index {} of {}: expected (\"{}\", \"{}\"), got (\"{}\", \"{}\")",
                    i, body.name, exp_name, exp_label, act_name, act_label,
                ),
            });
        }
    }
    Ok(())
}

/// Assert a rebuild pass finished without failures or cancellation.
pub fn assert_clean_rebuild(report: &RebuildReport, ctx: &str) -> Result<(), HarnessError> {
    if report.is_clean() {
        Ok(())
    } else {
        let failures: Vec<String> = report
            .failed
            .iter()
            .map(|(id, msg)| format!("  {}: {}", id, msg))
            .collect();
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] rebuild not clean (cancelled={}):\n{}",
                ctx,
                report.cancelled,
                if failures.is_empty() {
                    "  none".to_string()
                } else {
                    failures.join("\n")
                },
            ),
        })
    }
}
