//! BSVHU (end-of-life vehicles) signature workflow.
//!
//! ```text
//! INITIAL --EMISSION--> SIGNED_BY_PRODUCER --TRANSPORT--> SENT --OPERATION--> PROCESSED
//!                                                              \-OPERATION--> REFUSED
//! ```
//!
//! `PROCESSED` and `REFUSED` are terminal. The operation signature leads to
//! `REFUSED` only when the destination refused the waste on reception.
//!
//! Every accepted transition appends exactly one `BsvhuSigned` event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  event::{ActivityEvent, NewActivityEvent, StreamId},
  store::EventStore,
};

pub const BSVHU_SIGNED: &str = "BsvhuSigned";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BsvhuStatus {
  Initial,
  SignedByProducer,
  Sent,
  Processed,
  Refused,
}

impl BsvhuStatus {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Processed | Self::Refused) }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureType {
  Emission,
  Transport,
  Operation,
}

/// The destination's decision recorded on reception.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptationStatus {
  Accepted,
  Refused,
  PartiallyRefused,
}

/// A signature as submitted by the signing party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  pub signature_type: SignatureType,
  pub author:         String,
  /// Only meaningful on the operation signature.
  pub acceptation:    Option<AcceptationStatus>,
}

/// The status reached by applying `signature` in `current`.
pub fn next_status(current: BsvhuStatus, signature: &Signature) -> Result<BsvhuStatus> {
  use BsvhuStatus::*;
  use SignatureType::*;

  match (current, signature.signature_type) {
    (Initial, Emission) => Ok(SignedByProducer),
    (SignedByProducer, Transport) => Ok(Sent),
    (Sent, Operation) => match signature.acceptation {
      Some(AcceptationStatus::Refused) => Ok(Refused),
      _ => Ok(Processed),
    },
    (from, signature_type) => Err(Error::InvalidTransition {
      from:      from.to_string(),
      signature: signature_type.to_string(),
    }),
  }
}

/// Apply a signature to BSVHU `bsvhu_id` and record it in the activity log.
///
/// Nothing is appended when the transition is rejected.
pub async fn sign_bsvhu<S>(
  store: &S,
  bsvhu_id: &StreamId,
  actor: &str,
  current: BsvhuStatus,
  signature: &Signature,
) -> Result<(BsvhuStatus, ActivityEvent)>
where
  S: EventStore,
{
  let status = next_status(current, signature)?;

  let mut data = Map::new();
  data.insert("status".to_owned(), Value::String(status.to_string()));
  data.insert(
    "signatureType".to_owned(),
    Value::String(signature.signature_type.to_string()),
  );
  data.insert("signatureAuthor".to_owned(), Value::String(signature.author.clone()));
  if let Some(acceptation) = signature.acceptation {
    data.insert(
      "destinationReceptionAcceptationStatus".to_owned(),
      Value::String(acceptation.to_string()),
    );
  }

  let event = store
    .append(NewActivityEvent::new(
      bsvhu_id.clone(),
      BSVHU_SIGNED,
      actor,
      Value::Object(data),
    ))
    .await
    .map_err(Error::store)?;

  tracing::debug!(bsvhu_id = %bsvhu_id, from = %current, to = %status, "bsvhu signed");
  Ok((status, event))
}
