//! Pass target choice, aim gates and destination selection

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::charge::{ChargeChannel, ChargeResult};
use crate::bridge::SightBlockers;
use crate::helpers::{lerp, planar_angle_deg, planar_distance};
use crate::player::{PlayerBody, PlayerId};
use crate::tuning::GameplayTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardReason {
    Attack,
    /// A pass that failed its gate (or had no receiver)
    Fallback,
}

/// What a committed throw will do at the release frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThrowPlan {
    Pass { target: PlayerId },
    Forward { distance: f32, reason: ForwardReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateFailure {
    NoTarget,
    Angle,
    Range,
    LineOfSight,
    /// Within range, but farther than this charge can reach
    Charge,
}

impl GateFailure {
    pub fn code(self) -> &'static str {
        match self {
            GateFailure::NoTarget => "none",
            GateFailure::Angle => "angle",
            GateFailure::Range => "range",
            GateFailure::LineOfSight => "los",
            GateFailure::Charge => "charge",
        }
    }
}

/// A teammate that could receive a pass
#[derive(Debug, Clone, Copy)]
pub struct PassCandidate {
    pub id: PlayerId,
    pub catch_point: Vec3,
}

/// Configured receiver if set, otherwise the teammate closest to the aim direction
pub fn choose_pass_target(
    thrower: PlayerId,
    body: &PlayerBody,
    configured: Option<PlayerId>,
    candidates: &[PassCandidate],
    auto_select: bool,
) -> Option<PassCandidate> {
    if let Some(id) = configured
        && id != thrower
    {
        return candidates.iter().find(|c| c.id == id).copied();
    }
    if !auto_select {
        return None;
    }
    candidates
        .iter()
        .filter(|c| c.id != thrower)
        .map(|c| (planar_angle_deg(body.forward, c.catch_point - body.position), c))
        .min_by(|(a, ca), (b, cb)| a.total_cmp(b).then(ca.id.cmp(&cb.id)))
        .map(|(_, c)| *c)
}

/// Aim gate then distance gate for a pass to `target`
pub fn pass_gate(
    body: &PlayerBody,
    target: &PassCandidate,
    charge01: f32,
    tuning: &GameplayTuning,
    sight: &SightBlockers,
) -> Result<(), GateFailure> {
    let to_target = target.catch_point - body.position;
    if planar_angle_deg(body.forward, to_target) > tuning.pass_max_angle {
        return Err(GateFailure::Angle);
    }
    let distance = planar_distance(body.position, target.catch_point);
    if distance > tuning.pass_max_distance {
        return Err(GateFailure::Range);
    }
    if tuning.require_line_of_sight && !sight.line_of_sight(body.release_origin(), target.catch_point) {
        return Err(GateFailure::LineOfSight);
    }
    let allowed = lerp(tuning.tap_max_pass_distance, tuning.hold_pass_limit(), charge01);
    if distance > allowed {
        return Err(GateFailure::Charge);
    }
    Ok(())
}

/// Forward distance used when a pass is abandoned
pub fn fallback_distance(body: &PlayerBody, target: Option<&PassCandidate>, tuning: &GameplayTuning) -> f32 {
    let raw = match target {
        Some(target) => planar_distance(body.position, target.catch_point),
        None => tuning.pass_max_distance * tuning.fallback_max_fraction,
    };
    raw.clamp(
        tuning.fallback_min_dist.min(tuning.pass_max_distance),
        tuning.pass_max_distance,
    )
}

/// Decide the plan at commit. The gate failure, if any, is returned for logging.
pub fn select_plan(
    channel: ChargeChannel,
    result: &ChargeResult,
    body: &PlayerBody,
    target: Option<&PassCandidate>,
    tuning: &GameplayTuning,
    sight: &SightBlockers,
) -> (ThrowPlan, Option<GateFailure>) {
    match channel {
        ChargeChannel::Attack => (
            ThrowPlan::Forward {
                distance: lerp(tuning.forward_min_dist, tuning.forward_max_dist, result.charge01),
                reason: ForwardReason::Attack,
            },
            None,
        ),
        ChargeChannel::Pass => {
            let gate = match target {
                Some(candidate) => {
                    pass_gate(body, candidate, result.charge01, tuning, sight).map(|()| candidate.id)
                }
                None => Err(GateFailure::NoTarget),
            };
            match gate {
                Ok(id) => (ThrowPlan::Pass { target: id }, None),
                Err(failure) => (
                    ThrowPlan::Forward {
                        distance: fallback_distance(body, target, tuning),
                        reason: ForwardReason::Fallback,
                    },
                    Some(failure),
                ),
            }
        }
    }
}

/// World-space destination at release time. Passes aim at the receiver's live
/// catch point; forward throws are relative to the thrower's current facing.
pub fn resolve_destination(
    plan: &ThrowPlan,
    body: &PlayerBody,
    target_catch_point: Option<Vec3>,
    tuning: &GameplayTuning,
) -> Vec3 {
    let forward_point = |distance: f32| {
        body.position + body.forward * distance + Vec3::Y * tuning.forward_height_offset
    };
    match plan {
        ThrowPlan::Pass { .. } => target_catch_point
            .unwrap_or_else(|| forward_point(tuning.pass_max_distance * tuning.fallback_max_fraction)),
        ThrowPlan::Forward { distance, .. } => forward_point(*distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shooting::{ChargeProfile, charge_result};

    fn thrower() -> PlayerBody {
        PlayerBody::new(Vec3::ZERO, Vec3::Z)
    }

    fn candidate(id: u32, x: f32, z: f32) -> PassCandidate {
        PassCandidate {
            id: PlayerId(id),
            catch_point: Vec3::new(x, 1.4, z),
        }
    }

    fn tap() -> ChargeResult {
        charge_result(0.0, &GameplayTuning::default())
    }

    #[test]
    fn test_tap_pass_beyond_tap_range_falls_back() {
        let tuning = GameplayTuning::default();
        let target = candidate(1, 0.0, 12.0);
        let result = tap();
        assert_eq!(result.profile, ChargeProfile::Tap);

        let (plan, failure) = select_plan(
            ChargeChannel::Pass,
            &result,
            &thrower(),
            Some(&target),
            &tuning,
            &SightBlockers::default(),
        );
        assert_eq!(failure, Some(GateFailure::Charge));
        match plan {
            ThrowPlan::Forward { distance, reason } => {
                assert_eq!(reason, ForwardReason::Fallback);
                assert!((distance - 12.0).abs() < 1e-4);
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_full_charge_reaches_hold_limit() {
        let tuning = GameplayTuning::default();
        let result = charge_result(10.0, &tuning);
        let target = candidate(1, 0.0, 27.0);
        let (plan, failure) = select_plan(
            ChargeChannel::Pass,
            &result,
            &thrower(),
            Some(&target),
            &tuning,
            &SightBlockers::default(),
        );
        assert_eq!(failure, None);
        assert_eq!(plan, ThrowPlan::Pass { target: PlayerId(1) });
    }

    #[test]
    fn test_angle_gate() {
        let tuning = GameplayTuning::default();
        let behind = candidate(1, 0.0, -5.0);
        assert_eq!(
            pass_gate(&thrower(), &behind, 1.0, &tuning, &SightBlockers::default()),
            Err(GateFailure::Angle)
        );
    }

    #[test]
    fn test_range_gate() {
        let tuning = GameplayTuning::default();
        let far = candidate(1, 0.0, 60.0);
        assert_eq!(
            pass_gate(&thrower(), &far, 1.0, &tuning, &SightBlockers::default()),
            Err(GateFailure::Range)
        );
    }

    #[test]
    fn test_fallback_without_target() {
        let tuning = GameplayTuning::default();
        let distance = fallback_distance(&thrower(), None, &tuning);
        assert!((distance - 20.0).abs() < 1e-4);
        let close = candidate(1, 0.0, 2.0);
        assert_eq!(fallback_distance(&thrower(), Some(&close), &tuning), 6.0);
    }

    #[test]
    fn test_attack_distance_scales_with_charge() {
        let tuning = GameplayTuning::default();
        let (plan, _) = select_plan(
            ChargeChannel::Attack,
            &tap(),
            &thrower(),
            None,
            &tuning,
            &SightBlockers::default(),
        );
        assert_eq!(
            plan,
            ThrowPlan::Forward {
                distance: tuning.forward_min_dist,
                reason: ForwardReason::Attack
            }
        );
        let destination = resolve_destination(&plan, &thrower(), None, &tuning);
        assert_eq!(
            destination,
            Vec3::new(0.0, tuning.forward_height_offset, tuning.forward_min_dist)
        );
    }

    #[test]
    fn test_auto_select_prefers_smallest_angle() {
        let body = thrower();
        let candidates = [candidate(0, 0.0, 0.0), candidate(1, 5.0, 5.0), candidate(2, 1.0, 8.0)];
        let chosen = choose_pass_target(PlayerId(0), &body, None, &candidates, true).unwrap();
        assert_eq!(chosen.id, PlayerId(2));

        let configured =
            choose_pass_target(PlayerId(0), &body, Some(PlayerId(1)), &candidates, true).unwrap();
        assert_eq!(configured.id, PlayerId(1));

        assert!(choose_pass_target(PlayerId(0), &body, None, &candidates, false).is_none());
    }
}
