use crate::application::booking::{OfflineBooking, PaymentCallback};
use crate::application::catalog::ServiceDraft;
use crate::application::ledger::Posting;
use crate::application::marketplace::Marketplace;
use crate::application::ticketing::{Purchase, TicketTypeDraft, TicketTypePatch};
use crate::domain::artist::VerificationStatus;
use crate::domain::service::PricingRole;
use crate::domain::wallet::{EntrySource, Owner};
use crate::domain::withdrawal::{BankDetails, BankDetailsPatch, WithdrawalDecision};
use crate::error::{MarketError, Result};
use crate::infrastructure::gateway::HmacGateway;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

fn user_role() -> PricingRole {
    PricingRole::User
}

fn top_artist_limit() -> usize {
    4
}

fn adjustment() -> EntrySource {
    EntrySource::Adjustment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Processed,
    Rejected,
}

/// Every operation the batch runner understands, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    RegisterArtist {
        #[serde(default = "Uuid::new_v4")]
        user_id: Uuid,
        display_name: String,
        #[serde(default)]
        categories: Vec<String>,
        #[serde(default)]
        location: Option<String>,
    },
    RegisterPlanner {
        #[serde(default = "Uuid::new_v4")]
        user_id: Uuid,
        organization: String,
    },
    SetArtistVerification {
        artist_id: Uuid,
        status: VerificationStatus,
    },
    AddService {
        artist_id: Uuid,
        #[serde(flatten)]
        service: ServiceDraft,
    },
    SetCommission {
        artist_booking_commission: Decimal,
        ticket_sell_commission: Decimal,
    },
    GetCommission,
    CommissionHistory,
    DeleteCommission {
        commission_id: Uuid,
    },
    AddReview {
        artist_id: Uuid,
        client_id: Uuid,
        rating: u8,
        #[serde(default)]
        message: Option<String>,
    },
    ListReviews {
        artist_id: Uuid,
    },
    TopArtists {
        #[serde(default = "top_artist_limit")]
        limit: usize,
    },
    CheckAvailability {
        artist_id: Uuid,
        service_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Quote {
        artist_id: Uuid,
        service_id: Uuid,
        #[serde(default = "user_role")]
        role: PricingRole,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CreateOnlineBooking {
        client_id: Uuid,
        artist_id: Uuid,
        service_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CreateWalletBooking {
        planner_id: Uuid,
        artist_id: Uuid,
        service_id: Uuid,
        #[serde(default)]
        event_id: Option<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    CreateOfflineBooking {
        #[serde(flatten)]
        booking: OfflineBooking,
    },
    /// Sandbox capture: signs the callback locally, then confirms it.
    CapturePayment {
        order_id: String,
        #[serde(default)]
        payment_id: Option<String>,
    },
    ConfirmPayment {
        #[serde(flatten)]
        callback: PaymentCallback,
    },
    UpdateBookingStatus {
        booking_id: Uuid,
        status: String,
    },
    RefundBooking {
        booking_id: Uuid,
    },
    GetBooking {
        booking_id: Uuid,
    },
    ListBookings {
        #[serde(default)]
        artist_id: Option<Uuid>,
        #[serde(default)]
        client_id: Option<Uuid>,
    },
    CreateBlock {
        artist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: String,
        #[serde(default)]
        created_by: Option<Uuid>,
    },
    ListBlocks {
        artist_id: Uuid,
    },
    DeleteBlock {
        artist_id: Uuid,
        block_id: Uuid,
    },
    CreditWallet {
        owner: Owner,
        amount: Decimal,
        #[serde(default = "adjustment")]
        source: EntrySource,
        #[serde(default)]
        reference: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    DebitWallet {
        owner: Owner,
        amount: Decimal,
        #[serde(default = "adjustment")]
        source: EntrySource,
        #[serde(default)]
        reference: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    GetWallet {
        owner: Owner,
    },
    ListTransactions {
        owner: Owner,
    },
    /// Pays out to `bank_details_id` when given, else to inline details.
    RequestWithdrawal {
        owner: Owner,
        amount: Decimal,
        #[serde(default)]
        bank_details: BankDetails,
        #[serde(default)]
        bank_details_id: Option<Uuid>,
    },
    AddBankDetails {
        owner: Owner,
        #[serde(flatten)]
        details: BankDetails,
        #[serde(default)]
        is_primary: bool,
    },
    ListBankDetails {
        owner: Owner,
    },
    UpdateBankDetails {
        owner: Owner,
        bank_details_id: Uuid,
        #[serde(flatten)]
        patch: BankDetailsPatch,
    },
    DeleteBankDetails {
        owner: Owner,
        bank_details_id: Uuid,
    },
    DecideWithdrawal {
        withdrawal_id: Uuid,
        decision: Verdict,
        #[serde(default)]
        note: Option<String>,
    },
    ListWithdrawals {
        #[serde(default)]
        owner: Option<Owner>,
    },
    ReconcileWallet {
        owner: Owner,
        #[serde(default)]
        repair: bool,
    },
    CreateEvent {
        planner_id: Uuid,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    PublishEvent {
        planner_id: Uuid,
        event_id: Uuid,
    },
    CreateTicketType {
        planner_id: Uuid,
        event_id: Uuid,
        #[serde(flatten)]
        draft: TicketTypeDraft,
    },
    UpdateTicketType {
        planner_id: Uuid,
        ticket_type_id: Uuid,
        #[serde(flatten)]
        patch: TicketTypePatch,
    },
    DeleteTicketType {
        planner_id: Uuid,
        ticket_type_id: Uuid,
    },
    PurchaseTickets {
        #[serde(flatten)]
        purchase: Purchase,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    ScanTicket {
        planner_id: Uuid,
        ticket_id: Uuid,
        persons: u32,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    RunSweep {
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    IssueOtp {
        key: String,
    },
    VerifyOtp {
        key: String,
        code: String,
    },
}

/// What a successful command reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub message: &'static str,
    pub data: Option<Value>,
}

fn done<T: Serialize>(message: &'static str, data: &T) -> Result<Outcome> {
    Ok(Outcome {
        message,
        data: Some(serde_json::to_value(data)?),
    })
}

fn posting(
    owner: Owner,
    amount: Decimal,
    source: EntrySource,
    reference: Option<String>,
    description: Option<String>,
) -> Posting {
    Posting {
        owner,
        amount,
        source,
        reference,
        description: description.unwrap_or_else(|| "Manual adjustment".to_string()),
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegisterArtist { .. } => "register_artist",
            Command::RegisterPlanner { .. } => "register_planner",
            Command::SetArtistVerification { .. } => "set_artist_verification",
            Command::AddService { .. } => "add_service",
            Command::SetCommission { .. } => "set_commission",
            Command::GetCommission => "get_commission",
            Command::CommissionHistory => "commission_history",
            Command::DeleteCommission { .. } => "delete_commission",
            Command::AddReview { .. } => "add_review",
            Command::ListReviews { .. } => "list_reviews",
            Command::TopArtists { .. } => "top_artists",
            Command::CheckAvailability { .. } => "check_availability",
            Command::Quote { .. } => "quote",
            Command::CreateOnlineBooking { .. } => "create_online_booking",
            Command::CreateWalletBooking { .. } => "create_wallet_booking",
            Command::CreateOfflineBooking { .. } => "create_offline_booking",
            Command::CapturePayment { .. } => "capture_payment",
            Command::ConfirmPayment { .. } => "confirm_payment",
            Command::UpdateBookingStatus { .. } => "update_booking_status",
            Command::RefundBooking { .. } => "refund_booking",
            Command::GetBooking { .. } => "get_booking",
            Command::ListBookings { .. } => "list_bookings",
            Command::CreateBlock { .. } => "create_block",
            Command::ListBlocks { .. } => "list_blocks",
            Command::DeleteBlock { .. } => "delete_block",
            Command::CreditWallet { .. } => "credit_wallet",
            Command::DebitWallet { .. } => "debit_wallet",
            Command::GetWallet { .. } => "get_wallet",
            Command::ListTransactions { .. } => "list_transactions",
            Command::RequestWithdrawal { .. } => "request_withdrawal",
            Command::AddBankDetails { .. } => "add_bank_details",
            Command::ListBankDetails { .. } => "list_bank_details",
            Command::UpdateBankDetails { .. } => "update_bank_details",
            Command::DeleteBankDetails { .. } => "delete_bank_details",
            Command::DecideWithdrawal { .. } => "decide_withdrawal",
            Command::ListWithdrawals { .. } => "list_withdrawals",
            Command::ReconcileWallet { .. } => "reconcile_wallet",
            Command::CreateEvent { .. } => "create_event",
            Command::PublishEvent { .. } => "publish_event",
            Command::CreateTicketType { .. } => "create_ticket_type",
            Command::UpdateTicketType { .. } => "update_ticket_type",
            Command::DeleteTicketType { .. } => "delete_ticket_type",
            Command::PurchaseTickets { .. } => "purchase_tickets",
            Command::ScanTicket { .. } => "scan_ticket",
            Command::RunSweep { .. } => "run_sweep",
            Command::IssueOtp { .. } => "issue_otp",
            Command::VerifyOtp { .. } => "verify_otp",
        }
    }

    /// Runs the command against the marketplace. `signer` produces sandbox
    /// signatures for `capture_payment`.
    pub async fn execute(self, market: &Marketplace, signer: &HmacGateway) -> Result<Outcome> {
        match self {
            Command::RegisterArtist {
                user_id,
                display_name,
                categories,
                location,
            } => {
                let artist = market
                    .catalog
                    .register_artist(user_id, &display_name, categories, location)
                    .await?;
                done("Artist registered", &artist)
            }
            Command::RegisterPlanner {
                user_id,
                organization,
            } => {
                let planner = market.catalog.register_planner(user_id, &organization).await?;
                done("Planner registered", &planner)
            }
            Command::SetArtistVerification { artist_id, status } => {
                let artist = market
                    .catalog
                    .set_artist_verification(artist_id, status)
                    .await?;
                done("Verification updated", &artist)
            }
            Command::AddService { artist_id, service } => {
                let service = market.catalog.add_service(artist_id, service).await?;
                done("Service added", &service)
            }
            Command::SetCommission {
                artist_booking_commission,
                ticket_sell_commission,
            } => {
                let commission = market
                    .ledger
                    .set_commission(artist_booking_commission, ticket_sell_commission)
                    .await?;
                done("Commission updated", &commission)
            }
            Command::GetCommission => {
                let commission = market.ledger.current_commission().await?;
                done("Current commission", &commission)
            }
            Command::CommissionHistory => {
                let history = market.ledger.commission_history().await?;
                done("Commission history", &history)
            }
            Command::DeleteCommission { commission_id } => {
                let commission = market.ledger.delete_commission(commission_id).await?;
                done("Commission deleted", &commission)
            }
            Command::AddReview {
                artist_id,
                client_id,
                rating,
                message,
            } => {
                let review = market
                    .catalog
                    .add_review(artist_id, client_id, rating, message)
                    .await?;
                done("Review recorded", &review)
            }
            Command::ListReviews { artist_id } => {
                let reviews = market.catalog.reviews_of(artist_id).await?;
                done("Reviews listed", &reviews)
            }
            Command::TopArtists { limit } => {
                let artists = market.catalog.top_artists(limit).await?;
                done("Top artists", &artists)
            }
            Command::CheckAvailability {
                artist_id,
                service_id,
                start,
                end,
            } => {
                let availability = market
                    .availability
                    .check_availability(artist_id, service_id, start, end)
                    .await?;
                done("Availability checked", &availability)
            }
            Command::Quote {
                artist_id,
                service_id,
                role,
                start,
                end,
            } => {
                let priced = market
                    .availability
                    .quote(artist_id, service_id, role, start, end)
                    .await?;
                done("Quote computed", &priced)
            }
            Command::CreateOnlineBooking {
                client_id,
                artist_id,
                service_id,
                start,
                end,
            } => {
                let created = market
                    .bookings
                    .create_online(client_id, artist_id, service_id, start, end)
                    .await?;
                done("Booking created, awaiting payment", &created)
            }
            Command::CreateWalletBooking {
                planner_id,
                artist_id,
                service_id,
                event_id,
                start,
                end,
            } => {
                let booking = market
                    .bookings
                    .create_wallet_paid(planner_id, artist_id, service_id, event_id, start, end)
                    .await?;
                done("Booking confirmed", &booking)
            }
            Command::CreateOfflineBooking { booking } => {
                let booking = market.bookings.create_offline(booking).await?;
                done("Offline booking recorded", &booking)
            }
            Command::CapturePayment {
                order_id,
                payment_id,
            } => {
                let payment_id =
                    payment_id.unwrap_or_else(|| format!("pay_{}", Uuid::new_v4().simple()));
                let signature = signer.sign(&order_id, &payment_id)?;
                let confirmation = market
                    .bookings
                    .confirm_payment(PaymentCallback {
                        order_id,
                        payment_id,
                        signature,
                    })
                    .await?;
                done("Payment confirmed", &confirmation)
            }
            Command::ConfirmPayment { callback } => {
                let confirmation = market.bookings.confirm_payment(callback).await?;
                done("Payment confirmed", &confirmation)
            }
            Command::UpdateBookingStatus { booking_id, status } => {
                let booking = market.bookings.update_status(booking_id, &status).await?;
                done("Booking status updated", &booking)
            }
            Command::RefundBooking { booking_id } => {
                let booking = market.bookings.mark_refunded(booking_id).await?;
                done("Booking refunded", &booking)
            }
            Command::GetBooking { booking_id } => {
                let booking = market.bookings.booking(booking_id).await?;
                done("Booking found", &booking)
            }
            Command::ListBookings {
                artist_id,
                client_id,
            } => {
                let bookings = match (artist_id, client_id) {
                    (Some(artist_id), None) => market.bookings.bookings_of_artist(artist_id).await?,
                    (None, Some(client_id)) => market.bookings.bookings_of_client(client_id).await?,
                    _ => {
                        return Err(MarketError::ValidationError(
                            "Exactly one of artist_id or client_id is required".to_string(),
                        ));
                    }
                };
                done("Bookings listed", &bookings)
            }
            Command::CreateBlock {
                artist_id,
                start,
                end,
                title,
                created_by,
            } => {
                let block = market
                    .calendar
                    .create_block(artist_id, start, end, &title, created_by)
                    .await?;
                done("Calendar block created", &block)
            }
            Command::ListBlocks { artist_id } => {
                let blocks = market.calendar.list_blocks(artist_id).await?;
                done("Calendar blocks listed", &blocks)
            }
            Command::DeleteBlock {
                artist_id,
                block_id,
            } => {
                market.calendar.delete_block(artist_id, block_id).await?;
                Ok(Outcome {
                    message: "Calendar block deleted",
                    data: None,
                })
            }
            Command::CreditWallet {
                owner,
                amount,
                source,
                reference,
                description,
            } => {
                let entry = market
                    .ledger
                    .credit(posting(owner, amount, source, reference, description))
                    .await?;
                done("Wallet credited", &entry)
            }
            Command::DebitWallet {
                owner,
                amount,
                source,
                reference,
                description,
            } => {
                let entry = market
                    .ledger
                    .debit(posting(owner, amount, source, reference, description))
                    .await?;
                done("Wallet debited", &entry)
            }
            Command::GetWallet { owner } => {
                let wallet = market.ledger.wallet(owner).await?;
                done("Wallet found", &wallet)
            }
            Command::ListTransactions { owner } => {
                let entries = market.ledger.transactions(owner).await?;
                done("Transactions listed", &entries)
            }
            Command::RequestWithdrawal {
                owner,
                amount,
                bank_details,
                bank_details_id,
            } => {
                let request = match bank_details_id {
                    Some(id) => market.ledger.withdraw_to_saved(owner, amount, id).await?,
                    None => {
                        market
                            .ledger
                            .request_withdrawal(owner, amount, bank_details)
                            .await?
                    }
                };
                done("Withdrawal requested", &request)
            }
            Command::AddBankDetails {
                owner,
                details,
                is_primary,
            } => {
                let saved = market
                    .ledger
                    .add_bank_details(owner, details, is_primary)
                    .await?;
                done("Bank details added", &saved)
            }
            Command::ListBankDetails { owner } => {
                let saved = market.ledger.bank_details(owner).await?;
                done("Bank details listed", &saved)
            }
            Command::UpdateBankDetails {
                owner,
                bank_details_id,
                patch,
            } => {
                let saved = market
                    .ledger
                    .update_bank_details(owner, bank_details_id, patch)
                    .await?;
                done("Bank details updated", &saved)
            }
            Command::DeleteBankDetails {
                owner,
                bank_details_id,
            } => {
                market.ledger.delete_bank_details(owner, bank_details_id).await?;
                Ok(Outcome {
                    message: "Bank details deleted",
                    data: None,
                })
            }
            Command::DecideWithdrawal {
                withdrawal_id,
                decision,
                note,
            } => {
                let decision = match decision {
                    Verdict::Processed => WithdrawalDecision::Processed { note },
                    Verdict::Rejected => WithdrawalDecision::Rejected {
                        note: note.unwrap_or_default(),
                    },
                };
                let request = market
                    .ledger
                    .decide_withdrawal(withdrawal_id, decision)
                    .await?;
                done("Withdrawal decided", &request)
            }
            Command::ListWithdrawals { owner } => {
                let requests = market.ledger.withdrawals(owner).await?;
                done("Withdrawals listed", &requests)
            }
            Command::ReconcileWallet { owner, repair } => {
                let report = market.ledger.reconcile(owner, repair).await?;
                done("Wallet reconciled", &report)
            }
            Command::CreateEvent {
                planner_id,
                title,
                start,
                end,
            } => {
                let event = market
                    .ticketing
                    .create_event(planner_id, &title, start, end)
                    .await?;
                done("Event created", &event)
            }
            Command::PublishEvent {
                planner_id,
                event_id,
            } => {
                let event = market.ticketing.publish_event(planner_id, event_id).await?;
                done("Event published", &event)
            }
            Command::CreateTicketType {
                planner_id,
                event_id,
                draft,
            } => {
                let ticket_type = market
                    .ticketing
                    .create_ticket_type(planner_id, event_id, draft)
                    .await?;
                done("Ticket type created", &ticket_type)
            }
            Command::UpdateTicketType {
                planner_id,
                ticket_type_id,
                patch,
            } => {
                let ticket_type = market
                    .ticketing
                    .update_ticket_type(planner_id, ticket_type_id, patch)
                    .await?;
                done("Ticket type updated", &ticket_type)
            }
            Command::DeleteTicketType {
                planner_id,
                ticket_type_id,
            } => {
                market
                    .ticketing
                    .delete_ticket_type(planner_id, ticket_type_id)
                    .await?;
                Ok(Outcome {
                    message: "Ticket type deleted",
                    data: None,
                })
            }
            Command::PurchaseTickets { purchase, at } => {
                let ticket = market
                    .ticketing
                    .purchase(purchase, at.unwrap_or_else(Utc::now))
                    .await?;
                done("Tickets purchased", &ticket)
            }
            Command::ScanTicket {
                planner_id,
                ticket_id,
                persons,
                at,
            } => {
                let ticket = market
                    .ticketing
                    .scan(planner_id, ticket_id, persons, at.unwrap_or_else(Utc::now))
                    .await?;
                done("Ticket scanned", &ticket)
            }
            Command::RunSweep { at } => {
                let report = market.sweeper.run_once(at.unwrap_or_else(Utc::now)).await?;
                done("Sweep finished", &report)
            }
            Command::IssueOtp { key } => {
                let code = market.otp.issue(&key, Utc::now()).await;
                done("Code issued", &serde_json::json!({ "key": key, "code": code }))
            }
            Command::VerifyOtp { key, code } => {
                if market.otp.verify(&key, &code, Utc::now()).await {
                    done("Code verified", &serde_json::json!({ "key": key }))
                } else {
                    Err(MarketError::Unauthorized("Invalid or expired code".to_string()))
                }
            }
        }
    }
}
