// src/services/verifier.rs
//! Coupon verification service.
//!
//! Mirrors what the deployed policy enforcer does when an actor presents a
//! coupon: rebuild the canonical message, hash it, recover the signer and
//! compare it with the trusted issuer, then apply the class policy.
//!
//! Any divergence between this path and the issuer's encode/hash path would
//! make valid coupons fail silently, so both sides share the same encoder and
//! digest functions.

use crate::error::VerificationError;
use crate::models::actor::ActorIdentifier;
use crate::models::coupon::{Coupon, CouponClass, CouponPayload, CouponSignature, RECOVERY_BYTE_OFFSET};
use crate::utils::crypto::{address_from_verifying_key, coupon_digest, Digest};
use crate::utils::serialization::deserialize_coupon;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::scalar::IsHigh;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError, RwLock};

/// Verifier configuration: the single issuer identity it trusts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierConfig {
    pub issuer: ActorIdentifier,
}

/// Why a well-formed coupon was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenialReason {
    /// Signature recovers to someone other than the configured issuer.
    UntrustedSigner { recovered: ActorIdentifier },
    /// The class is not accepted in the current phase.
    ClassInactive(CouponClass),
    /// The coupon was already redeemed.
    AlreadyRedeemed,
}

/// Outcome of checking a coupon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Granted,
    Denied(DenialReason),
}

impl Verdict {
    pub fn is_granted(&self) -> bool {
        matches!(self, Verdict::Granted)
    }
}

/// Class/action policy consulted after the signer check passes.
pub trait CouponPolicy: Send + Sync {
    /// Returns a denial if the actor may not use a coupon of this class now.
    fn evaluate(&self, class: CouponClass, actor: &ActorIdentifier) -> Option<DenialReason>;

    /// Atomically marks the coupon as used. Returns `false` if it already was.
    fn record_redemption(&self, class: CouponClass, actor: &ActorIdentifier) -> bool;
}

/// Sale-phase policy.
///
/// Tracks which classes the current phase accepts and which
/// `(class, actor)` pairs have already redeemed their coupon.
#[derive(Debug, Default)]
pub struct PhasePolicy {
    active: RwLock<HashSet<CouponClass>>,
    redeemed: Mutex<HashSet<(CouponClass, ActorIdentifier)>>,
}

impl PhasePolicy {
    /// Policy that starts with the given classes active.
    pub fn with_active<I: IntoIterator<Item = CouponClass>>(classes: I) -> Self {
        let policy = PhasePolicy::default();
        policy.enter_phase(classes);
        policy
    }

    /// Replaces the set of classes accepted in the current phase.
    pub fn enter_phase<I: IntoIterator<Item = CouponClass>>(&self, classes: I) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = classes.into_iter().collect();
    }

    /// Stops honoring one class; issued coupons of that class stay untouched.
    pub fn revoke_class(&self, class: CouponClass) {
        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&class);
    }

    pub fn is_active(&self, class: CouponClass) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&class)
    }

    pub fn redemption_count(&self) -> usize {
        self.redeemed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl CouponPolicy for PhasePolicy {
    fn evaluate(&self, class: CouponClass, actor: &ActorIdentifier) -> Option<DenialReason> {
        if !self.is_active(class) {
            return Some(DenialReason::ClassInactive(class));
        }
        let redeemed = self.redeemed.lock().unwrap_or_else(PoisonError::into_inner);
        if redeemed.contains(&(class, *actor)) {
            return Some(DenialReason::AlreadyRedeemed);
        }
        None
    }

    fn record_redemption(&self, class: CouponClass, actor: &ActorIdentifier) -> bool {
        self.redeemed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((class, *actor))
    }
}

/// Recovers the address that produced `signature` over `digest`.
///
/// # Errors
/// `VerificationError::Unrecoverable` when `v` is not 27/28, when `r` or `s`
/// is zero or not below the curve order, when `s` is in the upper half of the
/// order (EIP-2), or when no public key matches. There is no fallback identity.
pub fn recover_signer(digest: &Digest, signature: &CouponSignature) -> Result<ActorIdentifier, VerificationError> {
    let recovery_byte = signature
        .v
        .checked_sub(RECOVERY_BYTE_OFFSET)
        .ok_or_else(|| VerificationError::Unrecoverable(format!("recovery byte v={} below 27", signature.v)))?;
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .filter(|id| !id.is_x_reduced())
        .ok_or_else(|| VerificationError::Unrecoverable(format!("recovery byte v={} out of range", signature.v)))?;

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&signature.r);
    bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&bytes)
        .map_err(|_| VerificationError::Unrecoverable("r or s is zero or exceeds the curve order".into()))?;
    if bool::from(parsed.s().is_high()) {
        return Err(VerificationError::Unrecoverable("s is not in the lower half of the curve order".into()));
    }

    let key = VerifyingKey::recover_from_prehash(digest, &parsed, recovery_id)
        .map_err(|e| VerificationError::Unrecoverable(e.to_string()))?;
    Ok(ActorIdentifier::from_address(address_from_verifying_key(&key)))
}

/// Verifier bound to one trusted issuer and a class policy.
pub struct Verifier<P: CouponPolicy = PhasePolicy> {
    config: VerifierConfig,
    policy: P,
}

impl<P: CouponPolicy> Verifier<P> {
    pub fn new(config: VerifierConfig, policy: P) -> Self {
        Verifier { config, policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Trusted issuer identity.
    pub fn issuer(&self) -> ActorIdentifier {
        self.config.issuer
    }

    /// Checks a presented coupon without consuming it.
    ///
    /// # Returns
    /// - `Ok(Verdict::Granted)` when the signer is the issuer and the policy allows it
    /// - `Ok(Verdict::Denied(_))` for a well-formed coupon that must be refused
    /// - `Err` when the coupon cannot be parsed or recovered at all
    pub fn verify(&self, payload: &CouponPayload, coupon: &Coupon) -> Result<Verdict, VerificationError> {
        if let Some(reason) = self.check_signer(payload, coupon)? {
            return Ok(self.deny(payload, reason));
        }
        match self.policy.evaluate(payload.class, &payload.actor) {
            Some(reason) => Ok(self.deny(payload, reason)),
            None => Ok(Verdict::Granted),
        }
    }

    /// Checks a coupon and, if granted, records it as used.
    ///
    /// Two concurrent redemptions of the same coupon cannot both be granted:
    /// the policy's redemption record is the deciding step.
    pub fn redeem(&self, payload: &CouponPayload, coupon: &Coupon) -> Result<Verdict, VerificationError> {
        let verdict = self.verify(payload, coupon)?;
        if !verdict.is_granted() {
            return Ok(verdict);
        }
        if !self.policy.record_redemption(payload.class, &payload.actor) {
            return Ok(self.deny(payload, DenialReason::AlreadyRedeemed));
        }
        debug!("redeemed {} coupon for {}", payload.class, payload.actor);
        Ok(Verdict::Granted)
    }

    fn check_signer(&self, payload: &CouponPayload, coupon: &Coupon) -> Result<Option<DenialReason>, VerificationError> {
        let signature = deserialize_coupon(coupon)?;
        let digest = coupon_digest(payload)?;
        let recovered = recover_signer(&digest, &signature)?;
        if recovered == self.config.issuer {
            Ok(None)
        } else {
            Ok(Some(DenialReason::UntrustedSigner { recovered }))
        }
    }

    fn deny(&self, payload: &CouponPayload, reason: DenialReason) -> Verdict {
        warn!("denied {} coupon for {}: {:?}", payload.class, payload.actor, reason);
        Verdict::Denied(reason)
    }
}
