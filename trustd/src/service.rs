//! Ledger Service
//!
//! Owns the trust registry and the governance ledger and applies requests
//! one at a time, in arrival order, from a single queue. Oracle callbacks
//! arrive on the same queue, so they interleave with requests exactly
//! like any other operation.
//!
//! The service keeps the block height. It only moves when a request asks
//! it to.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lib_governance::{
    custody_address, Ed25519Recovery, GovernanceLedger, Holder, LedgerEvent, O5Action, O5Command,
    ProtocolParams,
};
use lib_tokens::{MemoryTokenLedger, TokenContract, TokenLedger};
use lib_trust::{Declaration, DomainOracle, FetchResponse, IdentityAuthority, TrustEvent, TrustRegistry};
use lib_types::{Address, Amount, BlockHeight, CallContext, ChallengeId, Ring, TokenId};

use crate::config::NodeConfig;
use crate::errors::{NodeError, NodeResult};
use crate::oracle::{spawn_oracle_bridge, ChannelOracle, Fetcher};

// =============================================================================
// REQUESTS AND REPLIES
// =============================================================================

/// Operations a client can submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// Move the clock forward
    AdvanceBlocks { blocks: u64 },
    Height,

    // Trust registry
    DeclareRingThree {
        caller: Address,
        name: String,
        email: String,
        phone: String,
        #[serde(default)]
        info: String,
    },
    DeclareRingTwo { caller: Address, domain: String },
    InitChallenge { caller: Address, target: Address },
    /// Pays the quoted cost when `fee` is omitted
    SolveChallenge {
        caller: Address,
        challenge_id: ChallengeId,
        #[serde(default)]
        fee: Option<Amount>,
    },
    Challenge { challenge_id: ChallengeId },
    OracleCost,
    Status { address: Address },

    // Token ledger
    TransferTokens { caller: Address, to: Address, amount: Amount },
    TokenBalance { address: Address },

    // Governance ledger
    LockTokens { caller: Address, amount: Amount },
    WithdrawTokens { caller: Address, amount: Amount },
    DelegateVotingRights { caller: Address, to: Address, amount: Amount },
    WithdrawDelegatedVotingRights { caller: Address, to: Address, amount: Amount },
    DelegatePosat { caller: Address, to: Address, amount: Amount },
    WithdrawDelegatedPosat { caller: Address, to: Address, amount: Amount },
    O10Authorize { caller: Address },
    O10Deauthorize { caller: Address },
    O10VoteConfidence { caller: Address, target: Address },
    O10RevokeVote { caller: Address, target: Address },
    O10GetReward { caller: Address, target: Address },
    ExecuteO5 { caller: Address, command: O5Command },
    DissolveWithdrawal { caller: Address },
    Holder { address: Address },
    CurrentRing { address: Address },
    Params,
}

/// Result of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Done,
    Height { height: BlockHeight },
    ChallengeOpened { challenge_id: ChallengeId },
    Artifact { url: String, expected: String },
    Amount { amount: Amount },
    Status { ring: Ring, issued_at: BlockHeight, expires_at: BlockHeight },
    Holder { holder: Holder, voting_rights: Amount, available_posat: Amount },
    Ring { ring: Ring },
    Params { params: ProtocolParams },
    O5Executed { action: String },
    Error { message: String },
}

/// Response plus every event the request produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub height: BlockHeight,
    pub response: Response,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_events: Vec<TrustEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ledger_events: Vec<LedgerEvent>,
}

/// Queue entry
#[derive(Debug)]
pub enum ServiceMessage {
    Request {
        request: Request,
        reply: oneshot::Sender<Reply>,
    },
    OracleCallback(FetchResponse),
}

// =============================================================================
// SERVICE
// =============================================================================

/// Registry and ledger state with the current block height
#[derive(Debug)]
pub struct LedgerService {
    registry: TrustRegistry<ChannelOracle>,
    ledger: GovernanceLedger<MemoryTokenLedger>,
    height: BlockHeight,
    gas_price: Amount,
}

impl LedgerService {
    /// Build fresh state from configuration
    ///
    /// The token is owned by the ledger's custody account so that rewards
    /// can be minted; the initial supply goes to the treasury.
    pub fn new(config: &NodeConfig, oracle: ChannelOracle) -> NodeResult<Self> {
        config.validate()?;

        let registry = TrustRegistry::new(config.trust.clone(), oracle)?;

        let asset = TokenId::from_symbol(&config.token.symbol);
        let contract = TokenContract::new(
            config.token.name.clone(),
            config.token.symbol.clone(),
            config.ledger.decimals,
            custody_address(&asset),
        );
        let token = MemoryTokenLedger::new(contract, config.token.treasury, config.initial_supply()?)?;
        let ledger = GovernanceLedger::new(token, config.protocol_params()?)?;

        info!(
            "Ledger service ready: token={}, treasury={}, oracle={}",
            config.token.symbol,
            config.token.treasury,
            config.oracle.callback_address
        );
        Ok(Self {
            registry,
            ledger,
            height: 0,
            gas_price: config.oracle.gas_price as Amount,
        })
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    pub fn registry(&self) -> &TrustRegistry<ChannelOracle> {
        &self.registry
    }

    pub fn ledger(&self) -> &GovernanceLedger<MemoryTokenLedger> {
        &self.ledger
    }

    /// Apply one request. Failures are reported in the reply.
    pub fn handle(&mut self, request: Request) -> Reply {
        debug!("Request at block {}: {:?}", self.height, request);
        let response = match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                debug!("Request failed: {}", e);
                Response::Error { message: e.to_string() }
            }
        };
        self.reply(response)
    }

    /// Apply an oracle callback as the oracle's callback address
    pub fn handle_callback(&mut self, response: FetchResponse) -> Reply {
        let ctx = CallContext::new(self.registry.oracle().callback_address(), self.height);
        let result = self
            .registry
            .resolve_challenge(&ctx, response.challenge_id, response.body.as_deref());

        let response = match result {
            Ok(successful) => {
                info!("Challenge {} resolved: successful={}", response.challenge_id, successful);
                Response::Done
            }
            Err(e) => {
                warn!("Callback for challenge {} rejected: {}", response.challenge_id, e);
                Response::Error { message: e.to_string() }
            }
        };
        self.reply(response)
    }

    fn reply(&mut self, response: Response) -> Reply {
        Reply {
            height: self.height,
            response,
            trust_events: self.registry.drain_events(),
            ledger_events: self.ledger.drain_events(),
        }
    }

    fn dispatch(&mut self, request: Request) -> NodeResult<Response> {
        let height = self.height;
        let ctx = |caller: Address| CallContext::new(caller, height);

        let response = match request {
            Request::AdvanceBlocks { blocks } => {
                self.height = self
                    .height
                    .checked_add(blocks)
                    .ok_or_else(|| NodeError::InvalidRequest("block height overflow".to_string()))?;
                Response::Height { height: self.height }
            }
            Request::Height => Response::Height { height: self.height },

            // -----------------------------------------------------------------
            // Trust registry
            // -----------------------------------------------------------------
            Request::DeclareRingThree { caller, name, email, phone, info } => {
                let declaration = Declaration { name, email, phone, info };
                self.registry.declare_ring_three(&ctx(caller), declaration)?;
                Response::Done
            }
            Request::DeclareRingTwo { caller, domain } => {
                self.registry.declare_ring_two(&ctx(caller), domain)?;
                Response::Done
            }
            Request::InitChallenge { caller, target } => {
                let challenge_id = self.registry.init_challenge(&ctx(caller), target)?;
                Response::ChallengeOpened { challenge_id }
            }
            Request::SolveChallenge { caller, challenge_id, fee } => {
                let fee = fee.unwrap_or_else(|| self.registry.oracle_cost(self.gas_price));
                self.registry
                    .solve_challenge(&ctx(caller), challenge_id, fee, self.gas_price)?;
                Response::Done
            }
            Request::Challenge { challenge_id } => {
                let artifact = self.registry.challenge(&challenge_id)?;
                Response::Artifact {
                    url: artifact.url,
                    expected: artifact.expected,
                }
            }
            Request::OracleCost => Response::Amount {
                amount: self.registry.oracle_cost(self.gas_price),
            },
            Request::Status { address } => {
                let status = self.registry.status(&address, height);
                Response::Status {
                    ring: status.ring,
                    issued_at: status.issued_at,
                    expires_at: status.expires_at,
                }
            }

            // -----------------------------------------------------------------
            // Token ledger
            // -----------------------------------------------------------------
            Request::TransferTokens { caller, to, amount } => {
                let custody = self.ledger.custody();
                if to == custody {
                    return Err(NodeError::InvalidRequest(
                        "use lock_tokens to deposit into custody".to_string(),
                    ));
                }
                if caller == custody {
                    return Err(NodeError::InvalidRequest(
                        "custody funds leave only through withdrawals".to_string(),
                    ));
                }
                self.ledger.token_mut().transfer(caller, to, amount)?;
                Response::Done
            }
            Request::TokenBalance { address } => Response::Amount {
                amount: self.ledger.token().balance_of(&address),
            },

            // -----------------------------------------------------------------
            // Governance ledger
            // -----------------------------------------------------------------
            Request::LockTokens { caller, amount } => {
                self.ledger.lock_tokens(&ctx(caller), amount)?;
                Response::Done
            }
            Request::WithdrawTokens { caller, amount } => {
                self.ledger.withdraw_tokens(&ctx(caller), amount)?;
                Response::Done
            }
            Request::DelegateVotingRights { caller, to, amount } => {
                self.ledger.delegate_voting_rights(&ctx(caller), to, amount)?;
                Response::Done
            }
            Request::WithdrawDelegatedVotingRights { caller, to, amount } => {
                self.ledger.withdraw_delegated_voting_rights(&ctx(caller), to, amount)?;
                Response::Done
            }
            Request::DelegatePosat { caller, to, amount } => {
                self.ledger.delegate_posat(&ctx(caller), to, amount)?;
                Response::Done
            }
            Request::WithdrawDelegatedPosat { caller, to, amount } => {
                self.ledger.withdraw_delegated_posat(&ctx(caller), to, amount)?;
                Response::Done
            }
            Request::O10Authorize { caller } => {
                self.ledger.o10_authorize(&ctx(caller))?;
                Response::Done
            }
            Request::O10Deauthorize { caller } => {
                self.ledger.o10_deauthorize(&ctx(caller))?;
                Response::Done
            }
            Request::O10VoteConfidence { caller, target } => {
                self.ledger.o10_vote_confidence(&ctx(caller), target)?;
                Response::Done
            }
            Request::O10RevokeVote { caller, target } => {
                self.ledger.o10_revoke_vote(&ctx(caller), target)?;
                Response::Done
            }
            Request::O10GetReward { caller, target } => {
                let amount = self.ledger.o10_get_reward(&ctx(caller), target, &self.registry)?;
                Response::Amount { amount }
            }
            Request::ExecuteO5 { caller, command } => {
                let action = self.ledger.execute_o5(&ctx(caller), &command, &Ed25519Recovery)?;
                Response::O5Executed {
                    action: describe_action(&action),
                }
            }
            Request::DissolveWithdrawal { caller } => {
                let amount = self.ledger.dissolve_withdrawal(&ctx(caller))?;
                Response::Amount { amount }
            }
            Request::Holder { address } => Response::Holder {
                holder: self.ledger.holder(&address),
                voting_rights: self.ledger.voting_rights(&address),
                available_posat: self.ledger.available_posat(&address),
            },
            Request::CurrentRing { address } => Response::Ring {
                ring: self.ledger.current_ring(&address, height, &self.registry),
            },
            Request::Params => Response::Params {
                params: *self.ledger.params(),
            },
        };
        Ok(response)
    }

    /// Process the queue until every sender is gone
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<ServiceMessage>) {
        info!("Ledger service running");
        while let Some(message) = inbox.recv().await {
            match message {
                ServiceMessage::Request { request, reply } => {
                    let result = self.handle(request);
                    if reply.send(result).is_err() {
                        debug!("Client went away before the reply");
                    }
                }
                ServiceMessage::OracleCallback(response) => {
                    let reply = self.handle_callback(response);
                    debug!("Callback processed: {:?}", reply.response);
                }
            }
        }
        info!("Ledger service stopped at block {}", self.height);
    }
}

fn describe_action(action: &O5Action) -> String {
    match action {
        O5Action::Modify { param, value } => format!("{:?} set to {}", param, value),
        O5Action::VoteNoConfidence { target } => format!("vetoed {}", target),
        O5Action::Dissolve => "dissolved".to_string(),
        O5Action::Unrecognized => "no effect".to_string(),
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable client side of the service queue
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    sender: mpsc::UnboundedSender<ServiceMessage>,
}

impl ServiceHandle {
    /// Submit a request and wait for its reply
    pub async fn call(&self, request: Request) -> NodeResult<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ServiceMessage::Request { request, reply: reply_tx })
            .map_err(|_| NodeError::ServiceStopped)?;
        reply_rx.await.map_err(|_| NodeError::ServiceStopped)
    }
}

/// A running node: the service task and the oracle bridge task
pub struct Node {
    pub handle: ServiceHandle,
    pub service: JoinHandle<()>,
    pub bridge: JoinHandle<()>,
}

impl Node {
    /// Start the service and its oracle bridge
    ///
    /// Both tasks stop once every [`ServiceHandle`] has been dropped.
    pub fn start<F>(config: &NodeConfig, fetcher: Arc<F>) -> NodeResult<Self>
    where
        F: Fetcher + ?Sized + 'static,
    {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let oracle = ChannelOracle::new(config.oracle.callback_address, config.oracle.fee(), fetch_tx);
        let service = LedgerService::new(config, oracle)?;

        let (sender, inbox) = mpsc::unbounded_channel();
        // The bridge must not keep the service alive
        let callbacks = sender.downgrade();
        let bridge = spawn_oracle_bridge(fetcher, fetch_rx, move |response| {
            callbacks
                .upgrade()
                .map(|sender| sender.send(ServiceMessage::OracleCallback(response)).is_ok())
                .unwrap_or(false)
        });
        let service = tokio::spawn(service.run(inbox));

        Ok(Self {
            handle: ServiceHandle { sender },
            service,
            bridge,
        })
    }

    /// Drop the handle and wait for both tasks to finish
    pub async fn shutdown(self) -> NodeResult<()> {
        drop(self.handle);
        self.service
            .await
            .map_err(|e| NodeError::Oracle(format!("service task failed: {}", e)))?;
        self.bridge
            .await
            .map_err(|e| NodeError::Oracle(format!("bridge task failed: {}", e)))?;
        Ok(())
    }
}
