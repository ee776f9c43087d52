//! Named-operation surface: one JSON request in, one JSON response out.
//!
//! Every operation of [`JezeroService`] is reachable by its camelCase name with its
//! arguments passed as a JSON object. Failures never escape; they become a response
//! with `success: false` and the error message.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{
    Application, BinId, HabitatModule, ManufacturableItem, MonthlySummary, NewTrashItem,
    TrashId, TrashUpdate,
};
use crate::service::{JezeroService, ServiceError};

/// Every operation exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// `{ moduleName? }`
    GetSmartBins,
    /// `{ binId }`
    GetSmartBin,
    /// No arguments.
    GetUnassignedBins,
    /// `{ binId? }`
    GetTrashItems,
    /// `{ binId }`
    GetTrashItemsByBin,
    /// `{ binId, codeName, quantity? }`
    InsertTrashItem,
    /// `{ trashId, binId?, quantity? }`
    UpdateTrashItem,
    /// `{ binId, moduleName }`
    AssignBinToModule,
    /// No arguments.
    GetConsumableItems,
    /// `{ codeName, binId, quantity? }`
    ConvertConsumableToTrash,
    /// `{ moduleName }`
    GetTrashSummaryByModule,
    /// `{ sourceBinId }`
    DumpBinToInstation,
    /// `{ application? }`
    GetManufacturableItems,
    /// A full manufacturable item document.
    InsertManufacturableItem,
    /// `{ application? }`
    GetManufacturingAvailability,
    /// No arguments.
    GetMonthlySummary,
    /// A full monthly summary document.
    InsertMonthlySummary,
    /// `{ trashIds, processType? }`
    ProcessTrashForRecycling,
    /// `{ itemName }`
    CreateManufacturedItem,
    /// No arguments.
    GetAvailableMaterials,
    /// No arguments.
    GetBinFullnessStatus,
}

impl Operation {
    /// Every operation, in listing order.
    pub const ALL: [Self; 21] = [
        Self::GetSmartBins,
        Self::GetSmartBin,
        Self::GetUnassignedBins,
        Self::GetTrashItems,
        Self::GetTrashItemsByBin,
        Self::InsertTrashItem,
        Self::UpdateTrashItem,
        Self::AssignBinToModule,
        Self::GetConsumableItems,
        Self::ConvertConsumableToTrash,
        Self::GetTrashSummaryByModule,
        Self::DumpBinToInstation,
        Self::GetManufacturableItems,
        Self::InsertManufacturableItem,
        Self::GetManufacturingAvailability,
        Self::GetMonthlySummary,
        Self::InsertMonthlySummary,
        Self::ProcessTrashForRecycling,
        Self::CreateManufacturedItem,
        Self::GetAvailableMaterials,
        Self::GetBinFullnessStatus,
    ];

    /// Wire name of the operation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GetSmartBins => "getSmartBins",
            Self::GetSmartBin => "getSmartBin",
            Self::GetUnassignedBins => "getUnassignedBins",
            Self::GetTrashItems => "getTrashItems",
            Self::GetTrashItemsByBin => "getTrashItemsByBin",
            Self::InsertTrashItem => "insertTrashItem",
            Self::UpdateTrashItem => "updateTrashItem",
            Self::AssignBinToModule => "assignBinToModule",
            Self::GetConsumableItems => "getConsumableItems",
            Self::ConvertConsumableToTrash => "convertConsumableToTrash",
            Self::GetTrashSummaryByModule => "getTrashSummaryByModule",
            Self::DumpBinToInstation => "dumpBinToInstation",
            Self::GetManufacturableItems => "getManufacturableItems",
            Self::InsertManufacturableItem => "insertManufacturableItem",
            Self::GetManufacturingAvailability => "getManufacturingAvailability",
            Self::GetMonthlySummary => "getMonthlySummary",
            Self::InsertMonthlySummary => "insertMonthlySummary",
            Self::ProcessTrashForRecycling => "processTrashForRecycling",
            Self::CreateManufacturedItem => "createManufacturedItem",
            Self::GetAvailableMaterials => "getAvailableMaterials",
            Self::GetBinFullnessStatus => "getBinFullnessStatus",
        }
    }

    /// Whether the operation changes stored state.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::InsertTrashItem
                | Self::UpdateTrashItem
                | Self::AssignBinToModule
                | Self::ConvertConsumableToTrash
                | Self::DumpBinToInstation
                | Self::InsertManufacturableItem
                | Self::InsertMonthlySummary
                | Self::ProcessTrashForRecycling
                | Self::CreateManufacturedItem
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Unknown operation: {0}")]
/// Returned when an operation name is not recognised.
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.name() == name)
            .ok_or_else(|| UnknownOperation(name.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A call of one operation.
pub struct Request {
    /// Operation to run.
    pub operation: Operation,
    /// Arguments object; `null` means no arguments.
    #[serde(default)]
    pub args: Value,
}

impl Request {
    /// Build a request.
    #[must_use]
    pub fn new(operation: Operation, args: Value) -> Self {
        Self { operation, args }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Outcome of a request.
pub struct Response {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Result document on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum RpcError {
    #[error("Invalid arguments for {operation}: {source}")]
    Arguments {
        operation: Operation,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("Could not encode the result: {0}")]
    Encode(serde_json::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleArgs {
    #[serde(default)]
    module_name: Option<HabitatModule>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequiredModuleArgs {
    module_name: HabitatModule,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalBinArgs {
    #[serde(default)]
    bin_id: Option<BinId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinArgs {
    bin_id: BinId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTrashArgs {
    trash_id: TrashId,
    #[serde(flatten)]
    update: TrashUpdate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignArgs {
    bin_id: BinId,
    module_name: HabitatModule,
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertArgs {
    code_name: String,
    bin_id: BinId,
    #[serde(default = "one")]
    quantity: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DumpArgs {
    source_bin_id: BinId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationArgs {
    #[serde(default)]
    application: Option<Application>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecycleArgs {
    trash_ids: Vec<TrashId>,
    #[serde(default)]
    process_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManufactureArgs {
    item_name: String,
}

/// Run one request against the service.
pub async fn dispatch(service: &JezeroService, request: Request) -> Response {
    let operation = request.operation;
    debug!(%operation, "dispatching operation");

    match run(service, request).await {
        Ok(data) => Response::ok(data),
        Err(err) => {
            warn!(%operation, error = %err, "operation failed");
            Response::failure(err.to_string())
        }
    }
}

async fn run(service: &JezeroService, request: Request) -> Result<Value, RpcError> {
    let Request { operation, args } = request;

    match operation {
        Operation::GetSmartBins => {
            let ModuleArgs { module_name } = parse(operation, args)?;
            encode(&service.get_smart_bins(module_name).await?)
        }
        Operation::GetSmartBin => {
            let BinArgs { bin_id } = parse(operation, args)?;
            encode(&service.get_smart_bin(&bin_id).await?)
        }
        Operation::GetUnassignedBins => encode(&service.get_unassigned_bins().await?),
        Operation::GetTrashItems => {
            let OptionalBinArgs { bin_id } = parse(operation, args)?;
            encode(&service.get_trash_items(bin_id.as_ref()).await?)
        }
        Operation::GetTrashItemsByBin => {
            let BinArgs { bin_id } = parse(operation, args)?;
            encode(&service.get_trash_items_by_bin(&bin_id).await?)
        }
        Operation::InsertTrashItem => {
            let item: NewTrashItem = parse(operation, args)?;
            encode(&service.insert_trash_item(item).await?)
        }
        Operation::UpdateTrashItem => {
            let UpdateTrashArgs { trash_id, update } = parse(operation, args)?;
            encode(&service.update_trash_item(&trash_id, update).await?)
        }
        Operation::AssignBinToModule => {
            let AssignArgs { bin_id, module_name } = parse(operation, args)?;
            encode(&service.assign_bin_to_module(&bin_id, module_name).await?)
        }
        Operation::GetConsumableItems => encode(&service.get_consumable_items().await?),
        Operation::ConvertConsumableToTrash => {
            let ConvertArgs {
                code_name,
                bin_id,
                quantity,
            } = parse(operation, args)?;
            encode(
                &service
                    .convert_consumable_to_trash(&code_name, &bin_id, quantity)
                    .await?,
            )
        }
        Operation::GetTrashSummaryByModule => {
            let RequiredModuleArgs { module_name } = parse(operation, args)?;
            encode(&service.get_trash_summary_by_module(module_name).await?)
        }
        Operation::DumpBinToInstation => {
            let DumpArgs { source_bin_id } = parse(operation, args)?;
            encode(&service.dump_bin_to_instation(&source_bin_id).await?)
        }
        Operation::GetManufacturableItems => {
            let ApplicationArgs { application } = parse(operation, args)?;
            encode(&service.get_manufacturable_items(application).await?)
        }
        Operation::InsertManufacturableItem => {
            let item: ManufacturableItem = parse(operation, args)?;
            encode(&service.insert_manufacturable_item(item).await?)
        }
        Operation::GetManufacturingAvailability => {
            let ApplicationArgs { application } = parse(operation, args)?;
            encode(&service.get_manufacturing_availability(application).await?)
        }
        Operation::GetMonthlySummary => encode(&service.get_monthly_summary().await?),
        Operation::InsertMonthlySummary => {
            let summary: MonthlySummary = parse(operation, args)?;
            let created = service.insert_monthly_summary(&summary).await?;
            encode(&serde_json::json!({ "created": created }))
        }
        Operation::ProcessTrashForRecycling => {
            let RecycleArgs {
                trash_ids,
                process_type,
            } = parse(operation, args)?;
            encode(
                &service
                    .process_trash_for_recycling(&trash_ids, process_type.as_deref())
                    .await?,
            )
        }
        Operation::CreateManufacturedItem => {
            let ManufactureArgs { item_name } = parse(operation, args)?;
            encode(&service.create_manufactured_item(&item_name).await?)
        }
        Operation::GetAvailableMaterials => encode(&service.get_available_materials().await?),
        Operation::GetBinFullnessStatus => encode(&service.get_bin_fullness_status().await?),
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, args: Value) -> Result<T, RpcError> {
    let args = match args {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|source| RpcError::Arguments { operation, source })
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::Encode)
}
