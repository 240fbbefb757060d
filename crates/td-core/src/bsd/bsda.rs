//! BSDA: asbestos waste.

use crate::{
  Result,
  event::ActivityEvent,
  reducer::{PartialAggregate, Reducer},
  snapshot::HistoryField,
};

pub struct BsdaReducer;

impl Reducer for BsdaReducer {
  fn reduce(
    &self,
    state: PartialAggregate,
    event: &ActivityEvent,
  ) -> Result<PartialAggregate> {
    match event.event_type.as_str() {
      "BsdaCreated" => state.initiate(event, &[]),
      "BsdaUpdated" | "BsdaSigned" | "BsdaRevisionRequestApplied" => {
        state.merge_event(event, &[])
      }
      "BsdaDeleted" => Ok(state.mark_deleted()),
      _ => Ok(state),
    }
  }
}

pub fn is_complete(state: &PartialAggregate) -> bool {
  super::was_created(state)
}

pub const HISTORY_FIELDS: &[HistoryField] = &[
  HistoryField::column("initialWasteCode", "wasteCode"),
  HistoryField::column("initialWastePop", "wastePop"),
  HistoryField::column("initialPackagings", "packagings"),
  HistoryField::column("initialWasteSealNumbers", "wasteSealNumbers"),
  HistoryField::column("initialWasteMaterialName", "wasteMaterialName"),
  // The CAP under revision is the final outlet's, never the transit site's.
  HistoryField::coalesce(
    "initialDestinationCap",
    &["destinationOperationNextDestinationCap", "destinationCap"],
  ),
  HistoryField::column("initialDestinationReceptionWeight", "destinationReceptionWeight"),
  HistoryField::column(
    "initialDestinationReceptionRefusedWeight",
    "destinationReceptionRefusedWeight",
  ),
  HistoryField::column("initialDestinationOperationCode", "destinationOperationCode"),
  HistoryField::column(
    "initialDestinationOperationDescription",
    "destinationOperationDescription",
  ),
  HistoryField::column("initialDestinationOperationMode", "destinationOperationMode"),
  HistoryField::column("initialBrokerCompanyName", "brokerCompanyName"),
  HistoryField::column("initialBrokerCompanySiret", "brokerCompanySiret"),
  HistoryField::column("initialBrokerCompanyAddress", "brokerCompanyAddress"),
  HistoryField::column("initialBrokerCompanyContact", "brokerCompanyContact"),
  HistoryField::column("initialBrokerCompanyPhone", "brokerCompanyPhone"),
  HistoryField::column("initialBrokerCompanyMail", "brokerCompanyMail"),
  HistoryField::column("initialBrokerRecepisseNumber", "brokerRecepisseNumber"),
  HistoryField::column("initialBrokerRecepisseDepartment", "brokerRecepisseDepartment"),
  HistoryField::column(
    "initialBrokerRecepisseValidityLimit",
    "brokerRecepisseValidityLimit",
  ),
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
  "forwardingId",
  "groupedInId",
  "transporters",
  "intermediaries",
];
