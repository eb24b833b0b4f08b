pub mod ledger_json;

pub use ledger_json::{
    apply_command, execute_ledger_command_json, ledger_snapshot_json, ApiError, ApiResponse,
    CommandEffect, LedgerCommand, LedgerCommandRequest, LedgerCommandResponse, API_VERSION,
};
