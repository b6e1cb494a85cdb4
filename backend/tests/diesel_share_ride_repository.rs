//! Integration tests for `DieselShareRideRepository`.
//!
//! These run the guarded writes against embedded PostgreSQL so the partial
//! unique indexes, row locks and multi-table transactions are exercised for
//! real. Each test gets its own database cloned from a migrated template.

use carpool::domain::ports::{
    PassengerBooking, ShareRideRepository, ShareRideRepositoryError, UserAccountRepository,
};
use carpool::domain::{
    Coordinate, DriverStatus, NewShareRide, PassengerId, PassengerStatus, PassengerUpdate,
    PaymentMethod, PaymentStatus, RideWrite, ShareRideId, ShareRideUpdate, TransitionWrite,
    UserId, plan_transition,
};
use carpool::outbound::persistence::{
    DbPool, DieselShareRideRepository, DieselUserAccountRepository, PoolConfig,
};
use carpool::test_support::clock::fixed_timestamp;
use chrono::{DateTime, Duration, Utc};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{
    format_postgres_error, handle_cluster_setup_failure, provision_migrated_database,
    shared_cluster,
};

const FARE: i64 = 100;

struct TestContext {
    runtime: Runtime,
    rides: DieselShareRideRepository,
    accounts: DieselUserAccountRepository,
    driver_id: UserId,
    rider_id: UserId,
    database_url: String,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn client(&self) -> Client {
        Client::connect(self.database_url.as_str(), NoTls).expect("connect test client")
    }

    fn execute(&self, sql: &str, id: i64) {
        self.client()
            .execute(sql, &[&id])
            .unwrap_or_else(|err| panic!("{sql}: {}", format_postgres_error(&err)));
    }

    fn count(&self, sql: &str, id: i64) -> i64 {
        self.client()
            .query_one(sql, &[&id])
            .unwrap_or_else(|err| panic!("{sql}: {}", format_postgres_error(&err)))
            .get(0)
    }

    fn open_ride(&self) -> ShareRideId {
        self.runtime
            .block_on(self.rides.insert_ride(NewShareRide {
                driver_id: self.driver_id,
                created_at: fixed_timestamp(),
            }))
            .expect("insert searching ride")
    }

    fn booking(&self, ride_id: ShareRideId, user_id: UserId) -> PassengerBooking {
        PassengerBooking {
            share_ride_id: ride_id,
            driver_id: self.driver_id,
            user_id,
            destination: Coordinate::new(-6.2, 106.8).expect("valid coordinate"),
            distance: 10.0,
            fare: FARE,
            created_at: fixed_timestamp() + Duration::minutes(1),
        }
    }

    fn book(&self, ride_id: ShareRideId) -> PassengerId {
        self.runtime
            .block_on(self.rides.book_passenger(self.booking(ride_id, self.rider_id)))
            .expect("book passenger")
            .passenger_id
    }
}

fn seed_user(
    client: &mut Client,
    name: &str,
    coin: i64,
    is_driver: bool,
) -> Result<UserId, String> {
    let email = format!("{name}@carpool.test");
    let row = client
        .query_one(
            concat!(
                "INSERT INTO users (name, email, phone_number, coin, is_driver) ",
                "VALUES ($1, $2, $3, $4, $5) RETURNING id"
            ),
            &[&name, &email, &"+620000000", &coin, &is_driver],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(UserId::new(row.get(0)))
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_migrated_database(cluster)?;
    let database_url = database.url().to_string();

    let mut client =
        Client::connect(database_url.as_str(), NoTls).map_err(|err| format_postgres_error(&err))?;
    let driver_id = seed_user(&mut client, "driver", 50, true)?;
    let rider_id = seed_user(&mut client, "rider", 500, false)?;

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        rides: DieselShareRideRepository::new(pool.clone()),
        accounts: DieselUserAccountRepository::new(pool),
        driver_id,
        rider_id,
        database_url,
        _database: database,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn is_conflict<T>(result: &Result<T, ShareRideRepositoryError>) -> bool {
    matches!(result, Err(ShareRideRepositoryError::Conflict { .. }))
}

#[rstest]
fn second_searching_ride_for_a_driver_conflicts(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: second_searching_ride_for_a_driver_conflicts skipped");
        return;
    };
    let first = context.open_ride();

    let duplicate = context.runtime.block_on(context.rides.insert_ride(NewShareRide {
        driver_id: context.driver_id,
        created_at: fixed_timestamp() + Duration::minutes(5),
    }));
    assert!(is_conflict(&duplicate), "got {duplicate:?}");

    let finished_at = fixed_timestamp() + Duration::minutes(10);
    context
        .runtime
        .block_on(context.rides.finish_ride(first, finished_at))
        .expect("finish idle ride");
    let reopened = context.open_ride();
    assert_ne!(reopened, first);
}

#[rstest]
fn booking_writes_passenger_payment_and_detail(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: booking_writes_passenger_payment_and_detail skipped");
        return;
    };
    let ride_id = context.open_ride();
    let passenger_id = context.book(ride_id);

    let ride = context
        .runtime
        .block_on(context.rides.find_by_id(ride_id))
        .expect("load ride")
        .expect("ride exists");
    let [passenger] = ride.passengers.as_slice() else {
        panic!("expected one passenger, got {:?}", ride.passengers);
    };
    assert_eq!(passenger.id, passenger_id);
    assert_eq!(passenger.status, PassengerStatus::Waiting);
    let payment = passenger.primary_payment().expect("payment booked");
    assert_eq!(payment.status, PaymentStatus::Unpaid);
    assert_eq!(payment.recipient_id, context.driver_id);
    assert_eq!(payment.payer_id, context.rider_id);
    assert_eq!(payment.total_amount, FARE);
    let [detail] = payment.details.as_slice() else {
        panic!("expected one payment detail, got {:?}", payment.details);
    };
    assert_eq!(detail.method, PaymentMethod::Cash);
    assert_eq!(detail.amount, FARE);
    assert_eq!(
        ride.driver.as_ref().map(|driver| driver.name.as_str()),
        Some("driver")
    );
}

#[rstest]
fn failed_booking_leaves_no_partial_rows(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: failed_booking_leaves_no_partial_rows skipped");
        return;
    };
    let ride_id = context.open_ride();
    // The payment insert references a recipient that does not exist, so the
    // transaction fails after the passenger row was written.
    let mut booking = context.booking(ride_id, context.rider_id);
    booking.driver_id = UserId::new(i64::MAX);

    let result = context.runtime.block_on(context.rides.book_passenger(booking));

    assert!(
        matches!(result, Err(ShareRideRepositoryError::Query { .. })),
        "got {result:?}"
    );
    let sql = "SELECT COUNT(*) FROM passengers WHERE user_id = $1";
    assert_eq!(context.count(sql, context.rider_id.get()), 0);
    let active = context
        .runtime
        .block_on(context.rides.find_active_passenger_for_user(context.rider_id))
        .expect("lookup active passenger");
    assert!(active.is_none());
}

#[rstest]
fn booking_a_full_ride_conflicts(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: booking_a_full_ride_conflicts skipped");
        return;
    };
    let ride_id = context.open_ride();
    context.execute("UPDATE share_rides SET is_full = TRUE WHERE id = $1", ride_id.get());

    let result = context
        .runtime
        .block_on(context.rides.book_passenger(context.booking(ride_id, context.rider_id)));

    assert!(is_conflict(&result), "got {result:?}");
    let sql = "SELECT COUNT(*) FROM payments WHERE user_id = $1";
    assert_eq!(context.count(sql, context.rider_id.get()), 0);
}

#[rstest]
fn rider_cannot_hold_two_active_seats(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: rider_cannot_hold_two_active_seats skipped");
        return;
    };
    let first_ride = context.open_ride();
    context.book(first_ride);

    let mut client = context.client();
    let other_driver =
        seed_user(&mut client, "second-driver", 0, true).expect("seed second driver");
    let second_ride = context
        .runtime
        .block_on(context.rides.insert_ride(NewShareRide {
            driver_id: other_driver,
            created_at: fixed_timestamp(),
        }))
        .expect("insert second ride");
    let mut booking = context.booking(second_ride, context.rider_id);
    booking.driver_id = other_driver;

    let result = context.runtime.block_on(context.rides.book_passenger(booking));

    assert!(is_conflict(&result), "got {result:?}");
    let sql = "SELECT COUNT(*) FROM passengers WHERE share_ride_id = $1";
    assert_eq!(context.count(sql, second_ride.get()), 0);
}

#[rstest]
fn stale_transition_rolls_back_the_ride_write(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: stale_transition_rolls_back_the_ride_write skipped");
        return;
    };
    let ride_id = context.open_ride();
    let passenger_id = context.book(ride_id);
    // The ride write applies first and matches; the passenger guard then finds
    // the row in a different status, so both must be undone.
    let write = TransitionWrite {
        ride_id,
        passenger_id,
        expected_status: PassengerStatus::Arrived,
        passenger: PassengerUpdate {
            status: PassengerStatus::OnTheWay,
            dropped_at: None,
        },
        ride: Some(RideWrite {
            expected_status: DriverStatus::Searching,
            update: ShareRideUpdate::MarkFull,
        }),
        settlement: None,
    };

    let result = context.runtime.block_on(context.rides.apply_transition(write));

    assert!(is_conflict(&result), "got {result:?}");
    let ride = context
        .runtime
        .block_on(context.rides.find_by_id(ride_id))
        .expect("load ride")
        .expect("ride exists");
    assert!(!ride.is_full);
    assert_eq!(ride.driver_status, DriverStatus::Searching);
    assert_eq!(
        ride.passengers.first().map(|passenger| passenger.status),
        Some(PassengerStatus::Waiting)
    );
}

#[rstest]
fn completion_settles_payment_and_debits_driver(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: completion_settles_payment_and_debits_driver skipped");
        return;
    };
    let ride_id = context.open_ride();
    let passenger_id = context.book(ride_id);
    context.execute("UPDATE share_rides SET is_full = TRUE WHERE id = $1", ride_id.get());
    context.execute("UPDATE passengers SET status = 4 WHERE id = $1", passenger_id.get());

    let ride = context
        .runtime
        .block_on(context.rides.find_by_id(ride_id))
        .expect("load ride")
        .expect("ride exists");
    let passenger = context
        .runtime
        .block_on(context.rides.find_passenger(ride_id, passenger_id))
        .expect("load passenger")
        .expect("passenger exists");
    let done_at: DateTime<Utc> = fixed_timestamp() + Duration::minutes(30);
    let write = plan_transition(passenger.status, i64::from(PassengerStatus::Done.code()))
        .expect("on-the-way passengers may complete")
        .write_for(&ride, &passenger, done_at)
        .expect("passenger has a payment");

    context
        .runtime
        .block_on(context.rides.apply_transition(write))
        .expect("apply completion");

    let ride = context
        .runtime
        .block_on(context.rides.find_by_id(ride_id))
        .expect("reload ride")
        .expect("ride exists");
    assert_eq!(ride.driver_status, DriverStatus::Finished);
    assert_eq!(ride.finished_at, Some(done_at));
    let passenger = ride.passengers.first().expect("passenger kept");
    assert_eq!(passenger.status, PassengerStatus::Done);
    assert_eq!(passenger.dropped_at, Some(done_at));
    assert_eq!(
        passenger.primary_payment().map(|payment| payment.status),
        Some(PaymentStatus::Paid)
    );

    // The balance is allowed to go negative.
    let driver = context
        .runtime
        .block_on(context.accounts.find_by_id(context.driver_id))
        .expect("load driver")
        .expect("driver exists");
    assert_eq!(driver.coin, 50 - FARE);
}

#[rstest]
fn finishing_a_ride_with_an_active_passenger_conflicts(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: finishing_a_ride_with_an_active_passenger_conflicts skipped"
        );
        return;
    };
    let ride_id = context.open_ride();
    context.book(ride_id);

    let result = context
        .runtime
        .block_on(context.rides.finish_ride(ride_id, fixed_timestamp() + Duration::hours(1)));

    assert!(is_conflict(&result), "got {result:?}");
    let ride = context
        .runtime
        .block_on(context.rides.find_searching_by_driver(context.driver_id))
        .expect("lookup searching ride");
    assert_eq!(ride.map(|ride| ride.id), Some(ride_id));
}
