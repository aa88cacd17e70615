//! Acceptance policy.
//!
//! One pure function turns an offer, the current configuration, and the
//! blacklist into an accept/reject decision. Rules run in a fixed order
//! and the first decisive one wins.

use crate::config::EngineConfig;
use crate::geofence::GeofenceIndex;
use crate::types::{Decision, Offer, RejectReason};

/// Decide whether to take an offer.
///
/// Rule order: service toggle, destination blacklist, distance cap, bundle
/// size support, then the per-tier fee minimum.
pub fn decide(offer: &Offer, config: &EngineConfig, blacklist: &GeofenceIndex) -> Decision {
    if !config.general.service_enabled {
        return Decision::Reject(RejectReason::ServiceDisabled);
    }

    if blacklist.is_address_blacklisted(&offer.address) {
        return Decision::Reject(RejectReason::BlacklistedDestination);
    }

    if offer.distance_km > config.limits.max_distance_km {
        return Decision::Reject(RejectReason::TooFar);
    }

    let Some(minimum) = config.pricing.min_price_for(offer.call_count) else {
        return Decision::Reject(RejectReason::UnsupportedCallCount);
    };

    if offer.total_price >= minimum {
        Decision::Accept
    } else {
        Decision::Reject(RejectReason::BelowMinimum)
    }
}
