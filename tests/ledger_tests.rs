mod common;

use common::{SECRET, at, fund, world};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stagebook::application::booking::PaymentCallback;
use stagebook::application::ledger::Posting;
use stagebook::domain::money::Balance;
use stagebook::domain::wallet::{EntrySource, EntryStatus, EntryType, Owner};
use stagebook::domain::withdrawal::{BankDetails, WithdrawalDecision, WithdrawalStatus};
use stagebook::error::MarketError;
use stagebook::infrastructure::gateway::HmacGateway;
use uuid::Uuid;

fn upi() -> BankDetails {
    BankDetails {
        upi_id: Some("artist@upi".into()),
        ..BankDetails::default()
    }
}

#[tokio::test]
async fn test_balance_matches_completed_entries_after_mixed_activity() {
    let w = world().await;
    let artist = Owner::Artist(w.artist.id);
    fund(&w.market, artist, dec!(1500)).await;

    w.market
        .ledger
        .debit(Posting {
            owner: artist,
            amount: dec!(250),
            source: EntrySource::Adjustment,
            reference: None,
            description: "equipment fee".into(),
        })
        .await
        .unwrap();

    let kept = w.market.ledger.request_withdrawal(artist, dec!(300), upi()).await.unwrap();
    let dropped = w.market.ledger.request_withdrawal(artist, dec!(200), upi()).await.unwrap();
    w.market
        .ledger
        .decide_withdrawal(kept.id, WithdrawalDecision::Processed { note: None })
        .await
        .unwrap();
    w.market
        .ledger
        .decide_withdrawal(
            dropped.id,
            WithdrawalDecision::Rejected {
                note: "account closed".into(),
            },
        )
        .await
        .unwrap();

    let entries = w.market.ledger.transactions(artist).await.unwrap();
    let sum = |kind: EntryType| -> Decimal {
        entries
            .iter()
            .filter(|e| e.r#type == kind && e.status == EntryStatus::Completed)
            .map(|e| e.amount.value())
            .sum()
    };
    let wallet = w.market.ledger.wallet(artist).await.unwrap();
    assert_eq!(wallet.balance.value(), sum(EntryType::Credit) - sum(EntryType::Debit));
    assert_eq!(wallet.balance, Balance::new(dec!(950)));
    assert_eq!(wallet.pending_amount, Balance::ZERO);

    let report = w.market.ledger.reconcile(artist, false).await.unwrap();
    assert!(!report.drift);
}

#[tokio::test]
async fn test_commission_is_taken_from_the_total_price() {
    let w = world().await;
    w.market.ledger.set_commission(dec!(12.5), dec!(5)).await.unwrap();

    // 2 day units at 1000, advance 400 paid online
    let created = w
        .market
        .bookings
        .create_online(Uuid::new_v4(), w.artist.id, w.service.id, at(8, 12), at(9, 18))
        .await
        .unwrap();
    let signer = HmacGateway::new(SECRET);
    w.market
        .bookings
        .confirm_payment(PaymentCallback {
            order_id: created.order.order_id.clone(),
            payment_id: "pay_c".into(),
            signature: signer.sign(&created.order.order_id, "pay_c").unwrap(),
        })
        .await
        .unwrap();

    let artist = Owner::Artist(w.artist.id);
    let entries = w.market.ledger.transactions(artist).await.unwrap();
    assert_eq!(entries.len(), 1);
    // 400 - round(2000 * 12.5%)
    assert_eq!(entries[0].amount.value(), dec!(150));
    assert_eq!(entries[0].source, EntrySource::Booking);
    assert_eq!(entries[0].reference_id, Some(created.booking.id.to_string()));
}

#[tokio::test]
async fn test_withdrawal_respects_reserved_funds() {
    let w = world().await;
    let artist = Owner::Artist(w.artist.id);
    fund(&w.market, artist, dec!(1000)).await;
    w.market.ledger.request_withdrawal(artist, dec!(600), upi()).await.unwrap();

    let err = w
        .market
        .ledger
        .request_withdrawal(artist, dec!(500), upi())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::InsufficientFunds { requested, available }
            if requested == dec!(500) && available == dec!(400)
    ));

    let wallet = w.market.ledger.wallet(artist).await.unwrap();
    assert_eq!(wallet.balance, Balance::new(dec!(1000)));
    assert_eq!(wallet.pending_amount, Balance::new(dec!(600)));
}

#[tokio::test]
async fn test_withdrawal_cannot_be_decided_twice() {
    let w = world().await;
    let artist = Owner::Artist(w.artist.id);
    fund(&w.market, artist, dec!(100)).await;
    let request = w.market.ledger.request_withdrawal(artist, dec!(100), upi()).await.unwrap();

    let processed = w
        .market
        .ledger
        .decide_withdrawal(request.id, WithdrawalDecision::Processed { note: Some("paid".into()) })
        .await
        .unwrap();
    assert_eq!(processed.status, WithdrawalStatus::Processed);

    let again = w
        .market
        .ledger
        .decide_withdrawal(
            request.id,
            WithdrawalDecision::Rejected {
                note: "oops".into(),
            },
        )
        .await;
    assert!(matches!(again, Err(MarketError::InvalidStatus(_))));
    assert_eq!(
        w.market.ledger.wallet(artist).await.unwrap().balance,
        Balance::ZERO
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_drive_a_wallet_negative() {
    let w = world().await;
    let planner = Owner::Planner(w.planner.id);
    fund(&w.market, planner, dec!(100)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let market = w.market.clone();
        handles.push(tokio::spawn(async move {
            market
                .ledger
                .debit(Posting {
                    owner: planner,
                    amount: dec!(30),
                    source: EntrySource::Adjustment,
                    reference: None,
                    description: "fee".into(),
                })
                .await
        }));
    }
    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 3);

    let report = w.market.ledger.reconcile(planner, false).await.unwrap();
    assert!(!report.drift);
    assert_eq!(report.ledger_balance, dec!(10));
}
