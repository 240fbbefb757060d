//! BSDASRI: infectious healthcare waste.

use crate::{
  Result,
  event::ActivityEvent,
  reducer::{PartialAggregate, Reducer},
  snapshot::HistoryField,
};

pub struct BsdasriReducer;

impl Reducer for BsdasriReducer {
  fn reduce(
    &self,
    state: PartialAggregate,
    event: &ActivityEvent,
  ) -> Result<PartialAggregate> {
    match event.event_type.as_str() {
      "BsdasriCreated" => state.initiate(event, &[]),
      "BsdasriUpdated" | "BsdasriSigned" | "BsdasriRevisionRequestApplied" => {
        state.merge_event(event, &[])
      }
      "BsdasriDeleted" => Ok(state.mark_deleted()),
      _ => Ok(state),
    }
  }
}

pub fn is_complete(state: &PartialAggregate) -> bool {
  super::was_created(state)
}

pub const HISTORY_FIELDS: &[HistoryField] = &[
  HistoryField::column("initialWasteCode", "wasteCode"),
  HistoryField::column("initialDestinationWastePackagings", "destinationWastePackagings"),
  HistoryField::column(
    "initialDestinationReceptionWasteWeightValue",
    "destinationReceptionWasteWeightValue",
  ),
  HistoryField::column(
    "initialDestinationReceptionWasteVolume",
    "destinationReceptionWasteVolume",
  ),
  HistoryField::column("initialDestinationOperationCode", "destinationOperationCode"),
  HistoryField::column("initialDestinationOperationMode", "destinationOperationMode"),
  HistoryField::column("initialEmitterPickupSiteName", "emitterPickupSiteName"),
  HistoryField::column("initialEmitterPickupSiteAddress", "emitterPickupSiteAddress"),
  HistoryField::column("initialEmitterPickupSiteCity", "emitterPickupSiteCity"),
  HistoryField::column("initialEmitterPickupSitePostalCode", "emitterPickupSitePostalCode"),
  HistoryField::column("initialEmitterPickupSiteInfos", "emitterPickupSiteInfos"),
];

pub const STRUCTURAL_FIELDS: &[&str] = &[
  "id",
  "createdAt",
  "type",
  "emitterCompanySiret",
  "groupedInId",
  "synthesizedInId",
];
