// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC chain gateway backed by alloy.
//!
//! Two signing modes:
//!
//! - **Local key** (`CHAIN_PRIVATE_KEY` set): transactions are signed in
//!   process through an `EthereumWallet` filler.
//! - **Node accounts**: the node signs (`eth_accounts` / `eth_sendTransaction`),
//!   the same model as a browser-injected wallet. The first exposed account is
//!   the sender.
//!
//! Without an RPC URL the gateway still constructs, but every call fails with
//! [`GatewayError::ProviderUnavailable`] before touching the network.

use std::str::FromStr;
use std::sync::Arc;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use chrono::DateTime;
use tracing::{info, warn};

use crate::credential::{chain_credential_id, ContentHash};

use super::contract::ICredentialRegistry;
use super::events::{EpochGuard, ProviderEvents};
use super::gateway::{
    classify_rpc_error, validate_anchor_request, validate_batch, ChainGateway, GatewayError,
};
use super::types::{
    AnchorReceipt, AnchorRequest, Institution, InstitutionStatus, NetworkConfig, ProviderContext,
    VerificationResult,
};

struct Connection {
    provider: DynProvider,
    /// Local signer address; `None` means node-managed accounts.
    signer: Option<Address>,
}

pub struct RpcGateway {
    network: NetworkConfig,
    registry_address: Address,
    connection: Option<Connection>,
    events: Arc<ProviderEvents>,
}

/// Parse a hex private key (with or without `0x`).
pub fn signer_from_hex(private_key: &str) -> Result<PrivateKeySigner, GatewayError> {
    PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| GatewayError::InvalidInput(format!("invalid private key: {e}")))
}

impl RpcGateway {
    pub fn new(
        network: NetworkConfig,
        registry_address: &str,
        private_key: Option<&str>,
        events: Arc<ProviderEvents>,
    ) -> Result<Self, GatewayError> {
        let registry_address = Address::from_str(registry_address.trim())
            .map_err(|e| GatewayError::InvalidAddress(format!("registry contract: {e}")))?;

        let connection = match network.rpc_url.as_deref() {
            None => {
                warn!("No RPC endpoint configured; chain operations will be unavailable");
                None
            }
            Some(raw_url) => {
                let url: url::Url = raw_url.parse().map_err(|e: url::ParseError| {
                    GatewayError::InvalidInput(format!("invalid RPC URL: {e}"))
                })?;

                let connection = match private_key {
                    Some(key) => {
                        let signer = signer_from_hex(key)?;
                        let address = signer.address();
                        let provider = ProviderBuilder::new()
                            .wallet(EthereumWallet::from(signer))
                            .connect_http(url)
                            .erased();
                        Connection {
                            provider,
                            signer: Some(address),
                        }
                    }
                    None => Connection {
                        provider: ProviderBuilder::new().connect_http(url).erased(),
                        signer: None,
                    },
                };

                info!(
                    network = %network.name,
                    registry = %registry_address,
                    local_signer = connection.signer.is_some(),
                    "Chain gateway configured"
                );
                Some(connection)
            }
        };

        Ok(Self {
            network,
            registry_address,
            connection,
            events,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn connection(&self) -> Result<&Connection, GatewayError> {
        self.connection
            .as_ref()
            .ok_or(GatewayError::ProviderUnavailable)
    }

    fn registry(&self, connection: &Connection) -> ICredentialRegistry::ICredentialRegistryInstance<DynProvider> {
        ICredentialRegistry::new(self.registry_address, connection.provider.clone())
    }

    async fn accounts(&self, connection: &Connection) -> Result<Vec<Address>, GatewayError> {
        if let Some(address) = connection.signer {
            return Ok(vec![address]);
        }
        connection
            .provider
            .get_accounts()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))
    }

    async fn sender(&self, connection: &Connection) -> Result<Address, GatewayError> {
        self.accounts(connection)
            .await?
            .first()
            .copied()
            .ok_or(GatewayError::NoAccounts)
    }

    async fn check_network(&self, connection: &Connection) -> Result<(), GatewayError> {
        let Some(expected) = self.network.chain_id else {
            return Ok(());
        };
        let actual = connection
            .provider
            .get_chain_id()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        if actual != expected {
            return Err(GatewayError::WrongNetwork { expected, actual });
        }
        Ok(())
    }

    /// Common prologue for writes: capture the epoch, then resolve network and sender.
    async fn prepare_write(&self) -> Result<(&Connection, Address, EpochGuard), GatewayError> {
        let guard = self.events.guard();
        let connection = self.connection()?;
        self.check_network(connection).await?;
        let sender = self.sender(connection).await?;
        Ok((connection, sender, guard))
    }

    /// Wait for the receipt. Once submitted a transaction cannot be recalled,
    /// so context changes are not checked past this point.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<AnchorReceipt, GatewayError> {
        let tx_hash = pending.tx_hash().to_string();
        info!(tx_hash = %tx_hash, "Registry transaction submitted, awaiting confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        if !receipt.status() {
            warn!(tx_hash = %tx_hash, "Registry transaction reverted on-chain");
            return Err(GatewayError::TransactionFailed(tx_hash));
        }

        Ok(AnchorReceipt {
            explorer_url: self.network.explorer_tx_url(&tx_hash),
            block_number: receipt.block_number,
            tx_hash,
        })
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    fn backend(&self) -> &'static str {
        "rpc"
    }

    async fn connect(&self) -> Result<String, GatewayError> {
        let connection = self.connection()?;
        self.check_network(connection).await?;
        let account = self.sender(connection).await?;
        Ok(account.to_string())
    }

    async fn provider_context(&self) -> Result<ProviderContext, GatewayError> {
        let connection = self.connection()?;
        let chain_id = connection
            .provider
            .get_chain_id()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let accounts = self.accounts(connection).await?;
        Ok(ProviderContext {
            chain_id: Some(chain_id),
            accounts: accounts.iter().map(Address::to_string).collect(),
        })
    }

    async fn register_institution(
        &self,
        name: &str,
        accreditation_proof: &str,
        required_verifiers: u8,
    ) -> Result<AnchorReceipt, GatewayError> {
        let (connection, sender, guard) = self.prepare_write().await?;
        let registry = self.registry(connection);
        let call = registry
            .registerInstitution(
                name.to_string(),
                accreditation_proof.to_string(),
                U256::from(required_verifiers),
            )
            .from(sender);

        guard.ensure_current(&self.events)?;
        let pending = call
            .send()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        self.confirm(pending).await
    }

    async fn verify_institution(&self, institution: &str) -> Result<AnchorReceipt, GatewayError> {
        let target = Address::from_str(institution.trim())
            .map_err(|e| GatewayError::InvalidAddress(format!("{institution}: {e}")))?;

        let (connection, sender, guard) = self.prepare_write().await?;
        let registry = self.registry(connection);
        let call = registry.verifyInstitution(target).from(sender);

        guard.ensure_current(&self.events)?;
        let pending = call
            .send()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        self.confirm(pending).await
    }

    async fn institution(&self, address: &str) -> Result<Option<Institution>, GatewayError> {
        let target = Address::from_str(address.trim())
            .map_err(|e| GatewayError::InvalidAddress(format!("{address}: {e}")))?;
        let connection = self.connection()?;

        let record = self
            .registry(connection)
            .getInstitution(target)
            .call()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        // Unregistered addresses come back as a zeroed struct.
        if record.name.is_empty() {
            return Ok(None);
        }

        Ok(Some(Institution {
            address: target.to_string(),
            name: record.name,
            status: InstitutionStatus::from_code(record.status),
            accreditation_proof: record.accreditationProof,
            verifiers: record.verifiers.iter().map(Address::to_string).collect(),
        }))
    }

    async fn issue(&self, request: &AnchorRequest) -> Result<AnchorReceipt, GatewayError> {
        validate_anchor_request(request)?;

        let (connection, sender, guard) = self.prepare_write().await?;
        let registry = self.registry(connection);
        let call = registry
            .issueCredential(
                chain_credential_id(&request.credential_id),
                request.recipient.clone(),
                request.content_hash.as_b256(),
                request.metadata_uri.clone(),
            )
            .from(sender);

        guard.ensure_current(&self.events)?;
        let pending = call
            .send()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let receipt = self.confirm(pending).await?;

        info!(
            credential_id = %request.credential_id,
            tx_hash = %receipt.tx_hash,
            block_number = ?receipt.block_number,
            "Credential anchored"
        );
        Ok(receipt)
    }

    async fn issue_batch(&self, requests: &[AnchorRequest]) -> Result<AnchorReceipt, GatewayError> {
        validate_batch(requests)?;

        let credentials: Vec<ICredentialRegistry::BatchCredential> = requests
            .iter()
            .map(|request| ICredentialRegistry::BatchCredential {
                id: chain_credential_id(&request.credential_id),
                recipient: request.recipient.clone(),
                credentialHash: request.content_hash.as_b256(),
                metadataURI: request.metadata_uri.clone(),
            })
            .collect();

        let (connection, sender, guard) = self.prepare_write().await?;
        let registry = self.registry(connection);
        let call = registry.issueBatchCredentials(credentials).from(sender);

        guard.ensure_current(&self.events)?;
        let pending = call
            .send()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let receipt = self.confirm(pending).await?;

        info!(
            count = requests.len(),
            tx_hash = %receipt.tx_hash,
            "Credential batch anchored"
        );
        Ok(receipt)
    }

    async fn verify(
        &self,
        credential_id: &str,
        content_hash: &ContentHash,
    ) -> Result<VerificationResult, GatewayError> {
        let connection = self.connection()?;

        let result = self
            .registry(connection)
            .verifyCredential(chain_credential_id(credential_id), content_hash.as_b256())
            .call()
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        let issue_date = u64::try_from(result.issueDate)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        let issuer = if result.issuer == Address::ZERO {
            String::new()
        } else {
            result.issuer.to_string()
        };

        Ok(VerificationResult {
            credential_id: credential_id.to_string(),
            is_valid: result.isValid,
            issuer,
            issue_date,
            metadata_uri: result.metadataURI,
        })
    }
}
