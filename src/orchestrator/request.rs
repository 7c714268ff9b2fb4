//! Order request and cancellation. Neither touches the index.

use tracing::info;

use super::core::MintOrchestrator;
use crate::error::MintError;
use crate::instructions::{Datum, Instruction, InstructionSet, Redeemer, Value};
use crate::orders::{AssetName, ClientIdentity, OrderDatum, OrderQueue, ORDER_TOKEN_NAME};
use crate::traits::{IndexStore, LedgerSnapshotReader, TransactionBuilder};
use crate::types::PositionRef;

impl<L, B, S> MintOrchestrator<L, B, S>
where
    L: LedgerSnapshotReader,
    B: TransactionBuilder,
    S: IndexStore,
{
    /// Lock the unit price at the order script for `name`, minting one order
    /// token that marks the locked position as a genuine order.
    pub async fn prepare_request(
        &self,
        client: &ClientIdentity,
        name: &str,
        destination_address: &str,
    ) -> Result<InstructionSet, MintError> {
        let name = AssetName::new(name)?;
        let snapshot = self.fetch_snapshot().await?;
        let settings = &snapshot.settings;
        let order_token = hex::encode(ORDER_TOKEN_NAME);

        let datum = OrderDatum {
            owner_key_hash: client.key_hash.clone(),
            name: name.clone(),
            price: settings.unit_price,
            destination_address: destination_address.to_string(),
        };

        let mut instructions = InstructionSet::new();
        instructions
            .push(Instruction::Mint {
                policy_id: settings.order_policy_id.clone(),
                asset_name: order_token.clone(),
                quantity: 1,
                redeemer: Redeemer::RequestOrders {
                    destination_addresses: vec![destination_address.to_string()],
                },
            })
            .push(Instruction::Produce {
                address: settings.order_script_address.clone(),
                value: Value::lovelace(settings.unit_price).with_asset(
                    &settings.order_policy_id,
                    &order_token,
                    1,
                ),
                datum: Datum::Order(datum),
            })
            .push(Instruction::RequireSigner {
                key_hash: client.key_hash.clone(),
            });

        self.hand_off(&instructions).await?;
        info!("Order requested for {} by {}", name, client.key_hash);
        Ok(instructions)
    }

    /// Release exactly one pending order back to its owner.
    ///
    /// The order must be in `queue` and owned by `client`.
    pub async fn prepare_cancel(
        &self,
        client: &ClientIdentity,
        position: &PositionRef,
        queue: &OrderQueue,
    ) -> Result<InstructionSet, MintError> {
        let order = queue.get(position).ok_or_else(|| MintError::UnknownOrder {
            position: position.clone(),
        })?;
        if order.datum.owner_key_hash != client.key_hash {
            return Err(MintError::NotOrderOwner {
                position: position.clone(),
            });
        }

        let snapshot = self.fetch_snapshot().await?;
        let settings = &snapshot.settings;

        let mut instructions = InstructionSet::new();
        instructions
            .push(Instruction::Spend {
                position: position.clone(),
                redeemer: Redeemer::ReleaseOrder,
            })
            .push(Instruction::Mint {
                policy_id: settings.order_policy_id.clone(),
                asset_name: hex::encode(ORDER_TOKEN_NAME),
                quantity: -1,
                redeemer: Redeemer::CancelOrder,
            })
            .push(Instruction::Produce {
                address: client.address.clone(),
                value: Value::lovelace(order.datum.price),
                datum: Datum::Void,
            })
            .push(Instruction::RequireSigner {
                key_hash: client.key_hash.clone(),
            });

        self.hand_off(&instructions).await?;
        info!("Order {} for {} cancelled", position, order.name());
        Ok(instructions)
    }
}
