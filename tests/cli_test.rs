mod common;

use anyhow::Result;
use bankdesk::cli::Cli;
use bankdesk::config::DEFAULT_ADMIN_EMAIL;
use bankdesk::{AccountStatus, AccountType, BankError, BankService, Config};
use clap::Parser;
use common::{
    ADMIN_PASSWORD, PASSWORD, StandardCustomers, balance_of, database_path, test_service,
};

const RAHUL: &str = "rahul.sharma@email.com";
const PRIYA: &str = "priya.patel@email.com";

/// Run one command line against the database at `db`.
async fn run_cli(db: &str, args: &[&str]) -> Result<()> {
    let mut argv = vec!["bankdesk", "--database", db];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv)?.run().await
}

fn bank_error(err: &anyhow::Error) -> &BankError {
    err.downcast_ref::<BankError>()
        .unwrap_or_else(|| panic!("expected a BankError, got: {err:#}"))
}

#[tokio::test]
async fn test_customer_cannot_run_admin_commands() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    let rahul = StandardCustomers::rahul(&service).await?;
    StandardCustomers::priya(&service).await?;
    let number = StandardCustomers::open_funded(&service, &rahul, AccountType::Savings, 10_000)
        .await?;

    let err = run_cli(
        &db,
        &[
            "--email", PRIYA, "--password", PASSWORD,
            "admin", "account-status", number.as_str(), "inactive",
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(bank_error(&err), BankError::AdminRequired));

    let err = run_cli(&db, &["--email", PRIYA, "--password", PASSWORD, "admin", "stats"])
        .await
        .unwrap_err();
    assert!(matches!(bank_error(&err), BankError::AdminRequired));

    let err = run_cli(
        &db,
        &[
            "--email", PRIYA, "--password", PASSWORD,
            "admin", "customer-status", RAHUL, "inactive",
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(bank_error(&err), BankError::AdminRequired));

    let account = service.get_account(&number).await?.unwrap();
    assert_eq!(account.status, AccountStatus::Active);
    assert!(service.authenticate(RAHUL, PASSWORD).await?.is_some());

    Ok(())
}

#[test]
fn test_admin_identity_cannot_be_chosen_on_the_command_line() {
    let result = Cli::try_parse_from([
        "bankdesk",
        "--email",
        PRIYA,
        "--password",
        PASSWORD,
        "--admin-email",
        PRIYA,
        "admin",
        "stats",
    ]);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_admin_runs_admin_commands() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    StandardCustomers::admin(&service).await?;
    let rahul = StandardCustomers::rahul(&service).await?;
    let number = StandardCustomers::open_funded(&service, &rahul, AccountType::Savings, 10_000)
        .await?;

    let admin = ["--email", DEFAULT_ADMIN_EMAIL, "--password", ADMIN_PASSWORD];

    run_cli(&db, &[&admin[..], &["admin", "stats"]].concat()).await?;
    run_cli(
        &db,
        &[&admin[..], &["admin", "account-status", number.as_str(), "inactive"]].concat(),
    )
    .await?;
    run_cli(
        &db,
        &[&admin[..], &["admin", "customer-status", RAHUL, "inactive"]].concat(),
    )
    .await?;

    let account = service.get_account(&number).await?.unwrap();
    assert_eq!(account.status, AccountStatus::Inactive);
    assert!(service.authenticate(RAHUL, PASSWORD).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_init_creates_admin_login() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let db = database_path(&temp);

    run_cli(&db, &["init", "--admin-password", ADMIN_PASSWORD]).await?;

    let service = BankService::connect(Config::new(db.as_str())).await?;
    let admin = service
        .authenticate(DEFAULT_ADMIN_EMAIL, ADMIN_PASSWORD)
        .await?
        .expect("admin should authenticate");
    assert!(admin.is_admin());

    Ok(())
}

#[tokio::test]
async fn test_register_refuses_admin_email() -> Result<()> {
    let (_service, temp) = test_service().await?;
    let db = database_path(&temp);

    let err = run_cli(
        &db,
        &[
            "--email", DEFAULT_ADMIN_EMAIL, "--password", PASSWORD,
            "register", "--name", "Mallory", "--dob", "1990-01-01",
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(bank_error(&err), BankError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_money_commands_require_ownership() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    let rahul = StandardCustomers::rahul(&service).await?;
    let priya = StandardCustomers::priya(&service).await?;
    let rahuls = StandardCustomers::open_funded(&service, &rahul, AccountType::Savings, 50_000)
        .await?;
    let priyas = StandardCustomers::open_funded(&service, &priya, AccountType::Current, 0).await?;

    let as_priya = ["--email", PRIYA, "--password", PASSWORD];
    let attempts: Vec<Vec<&str>> = vec![
        vec!["deposit", rahuls.as_str(), "100"],
        vec!["withdraw", rahuls.as_str(), "100"],
        vec!["transfer", "100", "--from", rahuls.as_str(), "--to", priyas.as_str()],
        vec!["history", rahuls.as_str()],
        vec!["statement", rahuls.as_str()],
        vec!["account", "show", rahuls.as_str()],
        vec!["account", "verify", rahuls.as_str()],
    ];

    for attempt in attempts {
        let err = run_cli(&db, &[&as_priya[..], &attempt[..]].concat())
            .await
            .unwrap_err();
        assert!(
            matches!(bank_error(&err), BankError::AccessDenied(number) if *number == rahuls),
            "{attempt:?} was not refused"
        );
    }

    assert_eq!(balance_of(&service, &rahuls).await?, 50_000);
    assert_eq!(balance_of(&service, &priyas).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_owner_moves_money_through_cli() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    let rahul = StandardCustomers::rahul(&service).await?;
    let priya = StandardCustomers::priya(&service).await?;
    let rahuls = StandardCustomers::open_funded(&service, &rahul, AccountType::Savings, 1_000_000)
        .await?;
    let priyas = StandardCustomers::open_funded(&service, &priya, AccountType::Current, 0).await?;

    let as_rahul = ["--email", RAHUL, "--password", PASSWORD];
    run_cli(&db, &[&as_rahul[..], &["deposit", rahuls.as_str(), "5000"]].concat()).await?;
    run_cli(&db, &[&as_rahul[..], &["withdraw", rahuls.as_str(), "2,000.00"]].concat()).await?;
    run_cli(
        &db,
        &[
            &as_rahul[..],
            &["transfer", "1000", "--from", rahuls.as_str(), "--to", priyas.as_str()],
        ]
        .concat(),
    )
    .await?;
    run_cli(&db, &[&as_rahul[..], &["history", rahuls.as_str(), "--mini"]].concat()).await?;

    assert_eq!(balance_of(&service, &rahuls).await?, 1_200_000);
    assert_eq!(balance_of(&service, &priyas).await?, 100_000);

    Ok(())
}

#[tokio::test]
async fn test_admin_can_verify_any_account() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    StandardCustomers::admin(&service).await?;
    let rahul = StandardCustomers::rahul(&service).await?;
    let number = StandardCustomers::open_funded(&service, &rahul, AccountType::Savings, 10_000)
        .await?;

    run_cli(
        &db,
        &[
            "--email", DEFAULT_ADMIN_EMAIL, "--password", ADMIN_PASSWORD,
            "account", "verify", number.as_str(),
        ],
    )
    .await?;

    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_refused() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db = database_path(&temp);
    StandardCustomers::rahul(&service).await?;

    let err = run_cli(&db, &["--email", RAHUL, "--password", "guess", "accounts"])
        .await
        .unwrap_err();
    assert!(matches!(bank_error(&err), BankError::AuthenticationFailure));

    Ok(())
}
