use battle_mitra::admin::WinningsGrant;
use battle_mitra::ledger::{LedgerError, Payout};
use battle_mitra::model::{
    TeamSize, TournamentId, TournamentStatus, TransactionStatus, TransactionType, UserId,
};
use battle_mitra::payment::PaymentProof;
use battle_mitra::registry::{Entry, NewTournament, RegistryError};
use battle_mitra::{Amount, Config, Error, ErrorKind, Platform};

const ADMIN: UserId = 1;

fn platform() -> Platform {
    let mut platform = Platform::new(Config::default().with_admin("ops@battlemitra.in"));
    platform
        .upsert_profile(ADMIN, "Ops", "ops@battlemitra.in")
        .unwrap();
    for user in 2..=12 {
        platform
            .upsert_profile(user, &format!("Player {user}"), &format!("player{user}@example.com"))
            .unwrap();
    }
    platform
}

fn tournament(platform: &mut Platform, fee: &str, max: u32, size: TeamSize) -> TournamentId {
    platform
        .create_tournament(
            ADMIN,
            NewTournament {
                name: "Weekend Clash".to_string(),
                entry_fee: fee.to_string(),
                max_participants: max,
                team_size: size,
                timer_duration: 0,
            },
        )
        .unwrap()
        .id
}

fn fund(platform: &mut Platform, user: UserId, whole: i64) {
    let proof = PaymentProof {
        payer_name: format!("Player {user}"),
        transaction_id: format!("UTR{user}"),
        phone: "9876543210".to_string(),
    };
    let tx = platform
        .request_deposit(user, Amount::from_whole(whole), &proof)
        .unwrap();
    platform.approve(ADMIN, tx.id, None).unwrap();
}

fn payout() -> Payout {
    Payout {
        upi_id: "player@upi".to_string(),
        name: "Player".to_string(),
        mobile: "9876543210".to_string(),
    }
}

#[test]
fn resolved_transaction_never_changes_again() {
    let mut platform = platform();
    fund(&mut platform, 2, 100);
    let tx = platform
        .request_withdrawal(2, Amount::from_whole(40), &payout())
        .unwrap();
    platform.reject(ADMIN, tx.id, None).unwrap();

    for result in [
        platform.approve(ADMIN, tx.id, None),
        platform.reject(ADMIN, tx.id, Some("again".to_string())),
    ] {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, Error::Ledger(LedgerError::NotPending(..))));
    }
    let stored = platform.ledger().get_transaction(tx.id).unwrap();
    assert_eq!(stored.status, TransactionStatus::Rejected);
    assert_eq!(stored.admin_notes, tx.admin_notes);
}

#[test]
fn one_registration_per_user_and_tournament() {
    let mut platform = platform();
    let t = tournament(&mut platform, "", 10, TeamSize::Solo);
    platform
        .register_with_wallet(2, t, "BGMI-2", Entry::Solo)
        .unwrap();

    let err = platform
        .register_with_wallet(2, t, "BGMI-2-alt", Entry::Solo)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Registry(RegistryError::AlreadyRegistered { user: 2, .. })
    ));
    assert_eq!(platform.tournament_registrations(t).len(), 1);
    assert_eq!(platform.tournament(t).unwrap().current_participants, 1);
}

#[test]
fn full_tournament_rejects_and_keeps_count() {
    let mut platform = platform();
    let t = tournament(&mut platform, "Free", 2, TeamSize::Solo);
    platform.register_with_wallet(2, t, "g2", Entry::Solo).unwrap();
    platform.register_with_wallet(3, t, "g3", Entry::Solo).unwrap();

    let err = platform
        .register_with_wallet(4, t, "g4", Entry::Solo)
        .unwrap_err();
    assert!(matches!(err, Error::Registry(RegistryError::TournamentFull(_))));
    assert_eq!(platform.tournament(t).unwrap().current_participants, 2);
}

#[test]
fn full_team_rejects_join() {
    let mut platform = platform();
    let t = tournament(&mut platform, "Free", 20, TeamSize::Duo);
    let captain = platform
        .register_with_wallet(
            2,
            t,
            "g2",
            Entry::CreateTeam {
                team_name: "Night Owls".to_string(),
            },
        )
        .unwrap();
    let team = captain.team_id.unwrap();
    platform
        .register_with_wallet(3, t, "g3", Entry::JoinTeam { team_id: team })
        .unwrap();

    let err = platform
        .register_with_wallet(4, t, "g4", Entry::JoinTeam { team_id: team })
        .unwrap_err();
    assert!(matches!(err, Error::Registry(RegistryError::TeamFull(id)) if id == team));
    assert_eq!(platform.team_members(team).len(), 2);
    assert!(platform.check_existing(4, t).is_none());
}

#[test]
fn wallet_payment_needs_enough_balance() {
    let mut platform = platform();
    fund(&mut platform, 2, 29);
    let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);

    let err = platform
        .register_with_wallet(2, t, "g2", Entry::Solo)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let balance = platform.balance(2).unwrap();
    assert_eq!(balance.available_balance, Amount::from_whole(29));
    assert_eq!(balance.total_withdrawn, Amount::ZERO);
    assert!(platform.check_existing(2, t).is_none());
}

#[test]
fn free_tournament_last_slot() {
    let mut platform = platform();
    let t = tournament(&mut platform, "", 10, TeamSize::Solo);
    for user in 3..=11 {
        platform
            .register_with_wallet(user, t, &format!("g{user}"), Entry::Solo)
            .unwrap();
    }
    assert_eq!(platform.tournament(t).unwrap().current_participants, 9);

    let registration = platform
        .register_with_wallet(2, t, "g2", Entry::Solo)
        .unwrap();
    assert_eq!(registration.payment_amount, Amount::ZERO);

    let tournament = platform.tournament(t).unwrap();
    assert_eq!(tournament.current_participants, 10);
    assert_eq!(tournament.status, TournamentStatus::Full);
}

#[test]
fn wallet_funded_entry() {
    let mut platform = platform();
    fund(&mut platform, 2, 50);
    let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);

    let registration = platform
        .register_with_wallet(2, t, "g2", Entry::Solo)
        .unwrap();
    assert_eq!(registration.payment_amount, Amount::from_whole(30));
    assert_eq!(
        platform.balance(2).unwrap().available_balance,
        Amount::from_whole(20)
    );

    let payments: Vec<_> = platform
        .transactions(2)
        .into_iter()
        .filter(|tx| tx.transaction_type == TransactionType::Withdrawal)
        .collect();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, TransactionStatus::Approved);
    assert_eq!(payments[0].amount, Amount::from_whole(30));
    assert_eq!(platform.user_registrations(2).len(), 1);
}

#[test]
fn admin_grants_winnings() {
    let mut platform = platform();
    let tx = platform
        .grant_winnings(
            ADMIN,
            &WinningsGrant {
                email: "player5@example.com".to_string(),
                amount: Amount::from_whole(500),
                tournament_name: "Weekend Clash".to_string(),
                description: None,
            },
        )
        .unwrap();
    assert_eq!(tx.user_id, 5);
    assert_eq!(tx.transaction_type, TransactionType::Deposit);
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.payment_method, "Tournament Winnings");

    let balance = platform.balance(5).unwrap();
    assert_eq!(balance.available_balance, Amount::from_whole(500));
    assert_eq!(balance.pending_balance, Amount::ZERO);
}

#[test]
fn rejected_withdrawal_keeps_balance() {
    let mut platform = platform();
    fund(&mut platform, 2, 100);
    let tx = platform
        .request_withdrawal(2, Amount::from_whole(60), &payout())
        .unwrap();

    let rejected = platform
        .reject(ADMIN, tx.id, Some("insufficient proof".to_string()))
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);

    let balance = platform.balance(2).unwrap();
    assert_eq!(balance.available_balance, Amount::from_whole(100));
    assert_eq!(balance.pending_balance, Amount::ZERO);

    let seen_by_user = platform.transactions(2)[0];
    assert_eq!(seen_by_user.id, tx.id);
    assert_eq!(seen_by_user.admin_notes.as_deref(), Some("insufficient proof"));
}

#[test]
fn approving_withdrawal_rechecks_balance() {
    let mut platform = platform();
    fund(&mut platform, 2, 50);
    let withdrawal = platform
        .request_withdrawal(2, Amount::from_whole(40), &payout())
        .unwrap();
    let t = tournament(&mut platform, "₹30", 10, TeamSize::Solo);
    platform.register_with_wallet(2, t, "g2", Entry::Solo).unwrap();

    let err = platform.approve(ADMIN, withdrawal.id, None).unwrap_err();
    assert!(matches!(err, Error::Ledger(LedgerError::InsufficientBalance { .. })));
    assert_eq!(
        platform.ledger().get_transaction(withdrawal.id).unwrap().status,
        TransactionStatus::Pending
    );
}

#[test]
fn started_tournament_closes_registration_and_teams() {
    let mut platform = platform();
    let t = tournament(&mut platform, "Free", 20, TeamSize::Squad);
    let captain = platform
        .register_with_wallet(
            2,
            t,
            "g2",
            Entry::CreateTeam {
                team_name: "Squad".to_string(),
            },
        )
        .unwrap();
    platform
        .set_tournament_status(ADMIN, t, TournamentStatus::Ongoing)
        .unwrap();

    assert!(platform.available_teams(t).is_empty());
    let err = platform
        .register_with_wallet(
            3,
            t,
            "g3",
            Entry::JoinTeam {
                team_id: captain.team_id.unwrap(),
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
