//! BSDD: hazardous waste ("Form" in older event logs).
//!
//! Temporary storage lives in the nested `forwardedIn` object; its keys are
//! merged individually so a revision touching only the stored quantity does
//! not erase the transit site's CAP.

use crate::{
  Result,
  event::ActivityEvent,
  reducer::{PartialAggregate, Reducer},
  snapshot::HistoryField,
};

const NESTED: &[&str] = &["forwardedIn"];

pub struct BsddReducer;

impl Reducer for BsddReducer {
  fn reduce(
    &self,
    state: PartialAggregate,
    event: &ActivityEvent,
  ) -> Result<PartialAggregate> {
    match event.event_type.as_str() {
      "BsddCreated" | "FormCreated" => state.initiate(event, NESTED),
      "BsddUpdated"
      | "FormUpdated"
      | "BsddSigned"
      | "FormSigned"
      | "BsddRevisionRequestApplied" => state.merge_event(event, NESTED),
      "BsddDeleted" | "FormDeleted" => Ok(state.mark_deleted()),
      _ => Ok(state),
    }
  }
}

pub fn is_complete(state: &PartialAggregate) -> bool {
  super::was_created(state)
}

pub const HISTORY_FIELDS: &[HistoryField] = &[
  HistoryField::column("initialRecipientCap", "recipientCap"),
  HistoryField::column("initialWasteDetailsCode", "wasteDetailsCode"),
  HistoryField::column("initialWasteDetailsName", "wasteDetailsName"),
  HistoryField::column("initialWasteDetailsPop", "wasteDetailsPop"),
  HistoryField::column("initialWasteDetailsPackagingInfos", "wasteDetailsPackagingInfos"),
  HistoryField::column("initialWasteAcceptationStatus", "wasteAcceptationStatus"),
  HistoryField::column("initialWasteRefusalReason", "wasteRefusalReason"),
  HistoryField::column("initialWasteDetailsSampleNumber", "wasteDetailsSampleNumber"),
  HistoryField::column("initialWasteDetailsQuantity", "wasteDetailsQuantity"),
  HistoryField::column("initialQuantityReceived", "quantityReceived"),
  HistoryField::column("initialQuantityRefused", "quantityRefused"),
  HistoryField::column("initialProcessingOperationDone", "processingOperationDone"),
  HistoryField::column("initialDestinationOperationMode", "destinationOperationMode"),
  HistoryField::column(
    "initialProcessingOperationDescription",
    "processingOperationDescription",
  ),
  HistoryField::column("initialBrokerCompanyName", "brokerCompanyName"),
  HistoryField::column("initialBrokerCompanySiret", "brokerCompanySiret"),
  HistoryField::column("initialBrokerCompanyAddress", "brokerCompanyAddress"),
  HistoryField::column("initialBrokerCompanyContact", "brokerCompanyContact"),
  HistoryField::column("initialBrokerCompanyPhone", "brokerCompanyPhone"),
  HistoryField::column("initialBrokerCompanyMail", "brokerCompanyMail"),
  HistoryField::column("initialBrokerReceipt", "brokerReceipt"),
  HistoryField::column("initialBrokerDepartment", "brokerDepartment"),
  HistoryField::column("initialBrokerValidityLimit", "brokerValidityLimit"),
  HistoryField::column("initialTraderCompanyName", "traderCompanyName"),
  HistoryField::column("initialTraderCompanySiret", "traderCompanySiret"),
  HistoryField::column("initialTraderCompanyAddress", "traderCompanyAddress"),
  HistoryField::column("initialTraderCompanyContact", "traderCompanyContact"),
  HistoryField::column("initialTraderCompanyPhone", "traderCompanyPhone"),
  HistoryField::column("initialTraderCompanyMail", "traderCompanyMail"),
  HistoryField::column("initialTraderReceipt", "traderReceipt"),
  HistoryField::column("initialTraderDepartment", "traderDepartment"),
  HistoryField::column("initialTraderValidityLimit", "traderValidityLimit"),
  HistoryField::nested(
    "initialTemporaryStorageDestinationCap",
    "forwardedIn",
    "recipientCap",
  ),
  HistoryField::nested(
    "initialTemporaryStorageDestinationProcessingOperation",
    "forwardedIn",
    "processingOperationDone",
  ),
  HistoryField::nested(
    "initialTemporaryStorageTemporaryStorerQuantityReceived",
    "forwardedIn",
    "quantityReceived",
  ),
];

pub const STRUCTURAL_FIELDS: &[&str] = &[
  "id",
  "readableId",
  "createdAt",
  "emitterType",
  "emitterCompanySiret",
  "forwardedInId",
  "grouping",
  "transporters",
  "intermediaries",
];
