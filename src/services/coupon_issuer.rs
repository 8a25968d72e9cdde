// src/services/coupon_issuer.rs
//! Coupon Issuer Service
//!
//! Turns an allow-list of actors into a coupon book: for every actor it runs
//! encode → digest → sign → serialize and stores the result under the
//! normalized identifier.
//!
//! Batches are all-or-nothing. Every identifier is normalized before the first
//! signature is produced, and the first malformed entry aborts the batch with
//! its position and original text.

use crate::error::{BatchIssuanceError, EncodingError};
use crate::models::actor::ActorIdentifier;
use crate::models::coupon::{Coupon, CouponBook, CouponClass, CouponPayload};
use crate::utils::crypto::coupon_digest;
use crate::utils::serialization::serialize_coupon;
use crate::wallet::key_management::IssuerKey;
use log::{debug, info};
use tokio::task::JoinSet;

/// Settings the issuer runs with.
#[derive(Clone, Debug)]
pub struct IssuerConfig {
    pub key: IssuerKey,
    /// Class issued when the caller does not name one.
    pub default_class: CouponClass,
    /// Number of blocking workers used by [`CouponIssuer::issue_all_concurrent`].
    pub workers: usize,
}

/// Issues coupons for one issuer key.
#[derive(Clone, Debug)]
pub struct CouponIssuer {
    config: IssuerConfig,
}

impl CouponIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        CouponIssuer { config }
    }

    /// Identity the verifier must trust for coupons from this issuer.
    pub fn identity(&self) -> ActorIdentifier {
        self.config.key.identity()
    }

    pub fn default_class(&self) -> CouponClass {
        self.config.default_class
    }

    /// Issues a single coupon for an already-normalized actor.
    pub fn issue_one(&self, class: CouponClass, actor: ActorIdentifier) -> Result<Coupon, BatchIssuanceError> {
        issue_coupon(&self.config.key, &CouponPayload::new(class, actor))
    }

    /// Sequential batch issuance in input order.
    pub fn issue_all<S: AsRef<str>>(&self, actors: &[S], class: CouponClass) -> Result<CouponBook, BatchIssuanceError> {
        issue_all(actors, class, &self.config.key)
    }

    /// Batch issuance fanned out over `workers` blocking tasks.
    ///
    /// Produces the same book as [`CouponIssuer::issue_all`]; signatures are
    /// deterministic, so the split does not affect any coupon.
    pub async fn issue_all_concurrent<S: AsRef<str>>(
        &self,
        actors: &[S],
        class: CouponClass,
    ) -> Result<CouponBook, BatchIssuanceError> {
        let normalized = normalize_actors(actors)?;
        let workers = self.config.workers.clamp(1, normalized.len().max(1));
        info!(
            "issuing {} {} coupons across {} workers for issuer {}",
            normalized.len(),
            class,
            workers,
            self.identity().to_checksum()
        );

        let chunk_size = normalized.len().div_ceil(workers).max(1);
        let mut tasks = JoinSet::new();
        for chunk in normalized.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let key = self.config.key.clone();
            tasks.spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|actor| issue_coupon(&key, &CouponPayload::new(class, actor)).map(|coupon| (actor, coupon)))
                    .collect::<Result<Vec<_>, _>>()
            });
        }

        let mut book = CouponBook::new();
        while let Some(joined) = tasks.join_next().await {
            let entries = joined.map_err(|e| BatchIssuanceError::Worker(e.to_string()))??;
            book.extend(entries);
        }

        info!("issued {} coupons", book.len());
        Ok(book)
    }
}

/// Reads an allow-list: one identifier per line.
///
/// Blank lines and lines starting with `#` are skipped; everything else is
/// kept verbatim (trimmed) so that malformed entries still reach
/// [`normalize_actors`] and fail the batch.
pub fn parse_allow_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Normalizes every identifier, failing on the first malformed entry.
pub fn normalize_actors<S: AsRef<str>>(actors: &[S]) -> Result<Vec<ActorIdentifier>, BatchIssuanceError> {
    actors
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            ActorIdentifier::parse(raw.as_ref()).map_err(|source| BatchIssuanceError::InvalidActor {
                index,
                input: raw.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

/// Encodes, hashes, signs and serializes one payload.
pub fn issue_coupon(key: &IssuerKey, payload: &CouponPayload) -> Result<Coupon, BatchIssuanceError> {
    let digest = coupon_digest(payload).map_err(|source: EncodingError| BatchIssuanceError::Encoding {
        actor: payload.actor.to_checksum(),
        source,
    })?;
    let signature = key.sign_digest(&digest)?;
    debug!("signed {} coupon for {}", payload.class, payload.actor);
    Ok(serialize_coupon(&signature))
}

/// Issues one coupon of `class` per actor.
///
/// # Arguments
/// * `actors` - Textual identifiers in any accepted spelling
/// * `class` - Coupon class to issue
/// * `key` - Issuer key
///
/// # Errors
/// - `InvalidActor` naming the first identifier that fails normalization
/// - `Signing` if the key cannot sign; the batch is abandoned
///
/// No partial book is ever returned.
pub fn issue_all<S: AsRef<str>>(
    actors: &[S],
    class: CouponClass,
    key: &IssuerKey,
) -> Result<CouponBook, BatchIssuanceError> {
    let normalized = normalize_actors(actors)?;
    info!(
        "issuing {} {} coupons for issuer {}",
        normalized.len(),
        class,
        key.identity().to_checksum()
    );

    let mut book = CouponBook::new();
    for actor in normalized {
        let coupon = issue_coupon(key, &CouponPayload::new(class, actor))?;
        book.insert(actor, coupon);
    }

    info!("issued {} coupons", book.len());
    Ok(book)
}
