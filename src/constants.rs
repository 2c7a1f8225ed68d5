//! Tunable constants for catchball
//!
//! All gameplay values are defined here for easy tweaking. Runtime values come
//! from `ThrowTuning`, which defaults to these.

// =============================================================================
// WORLD
// =============================================================================

pub const GRAVITY: f32 = -9.81; // m/s², negative is down
pub const MIN_FLIGHT_TIME: f32 = 0.01; // Floor applied before calling the solver
pub const ARC_EPSILON: f32 = 0.01; // Minimum apex clearance above the higher endpoint

// =============================================================================
// POSSESSION
// =============================================================================

pub const THROW_COOLDOWN: f32 = 0.3; // Seconds after a release before the thrower may reserve again
pub const RESERVATION_TIMEOUT: f32 = 1.5; // Reservation never attached is dropped after this
pub const RELEASE_WATCHDOG: f32 = 1.5; // Committed throw without a release frame is forced after this

// =============================================================================
// CHARGE (pass and attack channels share one curve)
// =============================================================================

pub const MIN_HOLD_POWER: f32 = 0.35;
pub const MAX_HOLD_POWER: f32 = 1.0;
pub const FULL_CHARGE_TIME: f32 = 1.2; // Seconds held to reach full charge
pub const TAP_THRESHOLD: f32 = 0.18; // Releases at or under this are taps
pub const TAP_POWER: f32 = 0.3;
pub const SLOW_FLIGHT_TIME: f32 = 1.1; // Flight time at zero charge (taps)
pub const FAST_FLIGHT_TIME: f32 = 0.55; // Flight time at full charge

// =============================================================================
// DESTINATION SELECTION
// =============================================================================

pub const FORWARD_MIN_DIST: f32 = 6.0;
pub const FORWARD_MAX_DIST: f32 = 18.0;
pub const FORWARD_HEIGHT_OFFSET: f32 = 1.0; // Attack landing point height above the thrower's feet
pub const PASS_MAX_ANGLE: f32 = 60.0; // Degrees off forward
pub const PASS_MAX_DISTANCE: f32 = 50.0;
pub const TAP_MAX_PASS_DISTANCE: f32 = 10.0;
pub const HOLD_MAX_PASS_DISTANCE: f32 = 28.0;
pub const FALLBACK_MIN_DIST: f32 = 6.0;
pub const FALLBACK_MAX_FRACTION: f32 = 0.4; // Fallback distance without a target, as a share of pass max

// =============================================================================
// GUIDED PASS
// =============================================================================

pub const GUIDED_ARC_HEIGHT: f32 = 1.5;
pub const GUIDED_MIN_ARC_HEIGHT: f32 = 0.01;
pub const GUIDED_DEFAULT_DURATION: f32 = 0.35;
pub const GUIDED_MIN_DURATION: f32 = 0.06;
pub const GUIDED_SECONDS_PER_METER: f32 = 0.035; // Duration grows with pass length

// =============================================================================
// CATCHING
// =============================================================================

pub const PRE_CATCH_TIMEOUT: f32 = 6.0; // Readiness armed by a pre-catch zone
pub const PASS_READY_TIMEOUT: f32 = 3.0; // Readiness armed on the receiver at pass commit

// =============================================================================
// PLAYER BODY
// =============================================================================

pub const HAND_HEIGHT: f32 = 1.3; // Release origin height when no hand slot is reported
pub const CATCH_HEIGHT: f32 = 1.4; // Upper catch point above the feet
pub const SPAWN_INPUT_DELAY: f32 = 0.5; // Input ignored for this long after spawning

// =============================================================================
// PRESENTATION NAMES
// =============================================================================

pub const CLIP_TAKE_MOVING: &str = "Take_Object";
pub const CLIP_TAKE_STILL: &str = "TakeObjectFull";
pub const CLIP_CATCH_UPPER: &str = "Catch_Upper";
pub const CLIP_CATCH_LOWER: &str = "Catch_Lower";
pub const CLIP_THROW_MOVING: &str = "Throw_Run";
pub const CLIP_THROW_STILL: &str = "ThrowFullBody";

pub const LAYER_THROW: &str = "ThrowLayer";
pub const LAYER_TAKE: &str = "TakeObjectLayer";
pub const LAYER_CATCH: &str = "CatchLayer";

pub const PARAM_CHARGE_POWER: &str = "ChargePower";
pub const PARAM_READY_UPPER: &str = "ReadyCatchUpper";
pub const PARAM_READY_LOWER: &str = "ReadyCatchLower";

pub const CLIP_FINISHED_PROGRESS: f32 = 0.95; // Normalized progress that counts as finished
pub const MOVING_THRESHOLD: f32 = 0.1; // Input magnitude above which a player counts as moving

// =============================================================================
// HEADLESS ARENA
// =============================================================================

pub const PICKUP_RADIUS: f32 = 1.2;
pub const PRE_CATCH_RADIUS: f32 = 6.0;
pub const CATCH_RADIUS: f32 = 0.8;
pub const LOWER_CATCH_HEIGHT: f32 = 0.5;
pub const OBJECT_RADIUS: f32 = 0.12;
pub const GROUND_BOUNCE: f32 = 0.35; // Vertical restitution on ground contact
pub const GROUND_FRICTION: f32 = 0.8; // Horizontal speed kept per ground contact
pub const SETTLE_SPEED: f32 = 0.5; // Below this on the ground an object is at rest
pub const MOVE_SPEED: f32 = 5.0; // Headless locomotion speed (m/s)
