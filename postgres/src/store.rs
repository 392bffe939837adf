//! `VoteStore` implementation over a PostgreSQL pool.

use crate::PostgresConfig;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use votecast_core::eligibility::VoterHistory;
use votecast_core::store::{RevenueTotals, StoreError, VoteConflict, VoteStore};
use votecast_core::types::{
    Contest, ContestId, Contestant, ContestantId, ContestantStatus, Money, PaymentStatus, Vote,
    VoteId, VoteKind, VoteOrder, VoteOrderId, VotePackage, VotePackageId, Voter,
};

/// Production `VoteStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PgVoteStore {
    pool: PgPool,
}

impl PgVoteStore {
    /// Wraps an existing pool (migrations are the caller's concern)
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the given configuration and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Storage`] when the pool cannot be established
    /// or migrations fail.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = config.build_pool().await.map_err(storage)?;
        crate::MIGRATOR.run(&pool).await.map_err(storage)?;
        tracing::info!(url = %config.url, "vote store connected, migrations applied");
        Ok(Self { pool })
    }

    /// The underlying pool, for sibling adapters sharing the connection
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Storage(err.to_string())
}

fn money_to_db(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Storage(format!("amount out of range: {amount}")))
}

/// Schema checks forbid negative amounts; clamp defensively on the way out.
fn money_from_db(cents: i64) -> Money {
    Money::from_cents(u64::try_from(cents).unwrap_or(0))
}

fn count_from_db(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn contest_from_row(row: &PgRow) -> Result<Contest, StoreError> {
    let voting_kind: String = row.try_get("voting_kind").map_err(storage)?;
    let default_vote_price: Option<i64> =
        row.try_get("default_vote_price_cents").map_err(storage)?;
    let max_votes_per_user: Option<i32> = row.try_get("max_votes_per_user").map_err(storage)?;
    Ok(Contest {
        id: ContestId::from_uuid(row.try_get("id").map_err(storage)?),
        owner_id: votecast_core::types::UserId::from_uuid(
            row.try_get("owner_id").map_err(storage)?,
        ),
        name: row.try_get("name").map_err(storage)?,
        voting_kind: VoteKind::parse(&voting_kind).map_err(storage)?,
        voting_starts_at: row.try_get("voting_starts_at").map_err(storage)?,
        voting_ends_at: row.try_get("voting_ends_at").map_err(storage)?,
        allow_guest_voting: row.try_get("allow_guest_voting").map_err(storage)?,
        allow_multiple_votes: row.try_get("allow_multiple_votes").map_err(storage)?,
        max_votes_per_user: max_votes_per_user.map(count_from_i32),
        vote_packages_enabled: row.try_get("vote_packages_enabled").map_err(storage)?,
        default_vote_price: default_vote_price.map(money_from_db),
        show_live_results: row.try_get("show_live_results").map_err(storage)?,
        show_voter_names: row.try_get("show_voter_names").map_err(storage)?,
    })
}

fn count_from_i32(count: i32) -> u32 {
    u32::try_from(count).unwrap_or(0)
}

fn contestant_from_row(row: &PgRow) -> Result<Contestant, StoreError> {
    let status: String = row.try_get("status").map_err(storage)?;
    let number: i32 = row.try_get("contest_number").map_err(storage)?;
    Ok(Contestant {
        id: ContestantId::from_uuid(row.try_get("id").map_err(storage)?),
        contest_id: ContestId::from_uuid(row.try_get("contest_id").map_err(storage)?),
        name: row.try_get("name").map_err(storage)?,
        contest_number: count_from_i32(number),
        status: ContestantStatus::parse(&status).map_err(storage)?,
    })
}

fn package_from_row(row: &PgRow) -> Result<VotePackage, StoreError> {
    let vote_count: i32 = row.try_get("vote_count").map_err(storage)?;
    let price: i64 = row.try_get("price_cents").map_err(storage)?;
    Ok(VotePackage {
        id: VotePackageId::from_uuid(row.try_get("id").map_err(storage)?),
        contest_id: ContestId::from_uuid(row.try_get("contest_id").map_err(storage)?),
        name: row.try_get("name").map_err(storage)?,
        vote_count: count_from_i32(vote_count),
        price: money_from_db(price),
        sort_order: row.try_get("sort_order").map_err(storage)?,
    })
}

fn order_from_row(row: &PgRow) -> Result<VoteOrder, StoreError> {
    let payment_status: String = row.try_get("payment_status").map_err(storage)?;
    let package_id: Option<uuid::Uuid> = row.try_get("package_id").map_err(storage)?;
    let total: i64 = row.try_get("total_amount_cents").map_err(storage)?;
    let fee: i64 = row.try_get("platform_fee_cents").map_err(storage)?;
    let vote_count: i32 = row.try_get("vote_count").map_err(storage)?;
    let votes_used: i32 = row.try_get("votes_used").map_err(storage)?;
    let votes_remaining: i32 = row.try_get("votes_remaining").map_err(storage)?;
    Ok(VoteOrder {
        id: VoteOrderId::from_uuid(row.try_get("id").map_err(storage)?),
        user_id: votecast_core::types::UserId::from_uuid(
            row.try_get("user_id").map_err(storage)?,
        ),
        contest_id: ContestId::from_uuid(row.try_get("contest_id").map_err(storage)?),
        package_id: package_id.map(VotePackageId::from_uuid),
        total_amount: money_from_db(total),
        platform_fee: money_from_db(fee),
        vote_count: count_from_i32(vote_count),
        votes_used: count_from_i32(votes_used),
        votes_remaining: count_from_i32(votes_remaining),
        payment_status: PaymentStatus::parse(&payment_status).map_err(storage)?,
        expires_at: row.try_get("expires_at").map_err(storage)?,
        created_at: row.try_get("created_at").map_err(storage)?,
    })
}

fn vote_from_row(row: &PgRow) -> Result<Vote, StoreError> {
    let kind: String = row.try_get("kind").map_err(storage)?;
    let user_id: Option<uuid::Uuid> = row.try_get("user_id").map_err(storage)?;
    let order_id: Option<uuid::Uuid> = row.try_get("order_id").map_err(storage)?;
    Ok(Vote {
        id: VoteId::from_uuid(row.try_get("id").map_err(storage)?),
        contest_id: ContestId::from_uuid(row.try_get("contest_id").map_err(storage)?),
        contestant_id: ContestantId::from_uuid(row.try_get("contestant_id").map_err(storage)?),
        voter_id: user_id.map(votecast_core::types::UserId::from_uuid),
        order_id: order_id.map(VoteOrderId::from_uuid),
        kind: VoteKind::parse(&kind).map_err(storage)?,
        ip_address: row.try_get("ip_address").map_err(storage)?,
        user_agent: row.try_get("user_agent").map_err(storage)?,
        cast_at: row.try_get("cast_at").map_err(storage)?,
    })
}

/// Maps unique-index violations on the votes table to typed conflicts; the
/// caller treats those as authoritative rejections.
fn map_vote_insert_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.constraint() {
            Some("votes_guest_once_per_contest") => {
                return StoreError::Conflict(VoteConflict::GuestAlreadyVoted);
            }
            Some("votes_free_once_per_contestant") => {
                return StoreError::Conflict(VoteConflict::DuplicateFreeVote);
            }
            _ => {}
        }
    }
    storage(err)
}

/// Inserts a vote row through the given executor.
///
/// Member votes in single-vote contests go through a conditional insert so
/// the "one vote per member per contest" rule holds even when two casts
/// race; zero affected rows means the member already voted.
async fn insert_vote_row<'e, E>(
    executor: E,
    vote: &Vote,
    single_vote_contest: bool,
) -> Result<(), StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let conditional = single_vote_contest && vote.voter_id.is_some();
    let sql = if conditional {
        "INSERT INTO votes
             (id, contest_id, contestant_id, user_id, order_id, kind,
              ip_address, user_agent, cast_at)
         SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
         WHERE NOT EXISTS (
             SELECT 1 FROM votes WHERE contest_id = $2 AND user_id = $4
         )"
    } else {
        "INSERT INTO votes
             (id, contest_id, contestant_id, user_id, order_id, kind,
              ip_address, user_agent, cast_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
    };

    let result = sqlx::query(sql)
        .bind(vote.id.as_uuid())
        .bind(vote.contest_id.as_uuid())
        .bind(vote.contestant_id.as_uuid())
        .bind(vote.voter_id.map(|id| *id.as_uuid()))
        .bind(vote.order_id.map(|id| *id.as_uuid()))
        .bind(vote.kind.as_str())
        .bind(&vote.ip_address)
        .bind(&vote.user_agent)
        .bind(vote.cast_at)
        .execute(executor)
        .await
        .map_err(map_vote_insert_err)?;

    if conditional && result.rows_affected() == 0 {
        return Err(StoreError::Conflict(VoteConflict::SingleVoteContest));
    }
    Ok(())
}

#[async_trait]
impl VoteStore for PgVoteStore {
    async fn create_contest(&self, contest: &Contest) -> Result<(), StoreError> {
        let default_price = contest
            .default_vote_price
            .map(money_to_db)
            .transpose()?;
        sqlx::query(
            "INSERT INTO contests
                 (id, owner_id, name, voting_kind, voting_starts_at, voting_ends_at,
                  allow_guest_voting, allow_multiple_votes, max_votes_per_user,
                  vote_packages_enabled, default_vote_price_cents,
                  show_live_results, show_voter_names)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(contest.id.as_uuid())
        .bind(contest.owner_id.as_uuid())
        .bind(&contest.name)
        .bind(contest.voting_kind.as_str())
        .bind(contest.voting_starts_at)
        .bind(contest.voting_ends_at)
        .bind(contest.allow_guest_voting)
        .bind(contest.allow_multiple_votes)
        .bind(contest.max_votes_per_user.map(i64::from))
        .bind(contest.vote_packages_enabled)
        .bind(default_price)
        .bind(contest.show_live_results)
        .bind(contest.show_voter_names)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn contest(&self, id: ContestId) -> Result<Option<Contest>, StoreError> {
        let row = sqlx::query("SELECT * FROM contests WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(contest_from_row).transpose()
    }

    async fn create_contestant(&self, contestant: &Contestant) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO contestants (id, contest_id, name, contest_number, status)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(contestant.id.as_uuid())
        .bind(contestant.contest_id.as_uuid())
        .bind(&contestant.name)
        .bind(i64::from(contestant.contest_number))
        .bind(contestant.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db))
                if db.constraint() == Some("contestants_number_unique") =>
            {
                Err(StoreError::DuplicateContestNumber)
            }
            Err(err) => Err(storage(err)),
        }
    }

    async fn contestant(
        &self,
        contest_id: ContestId,
        id: ContestantId,
    ) -> Result<Option<Contestant>, StoreError> {
        let row = sqlx::query("SELECT * FROM contestants WHERE contest_id = $1 AND id = $2")
            .bind(contest_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(contestant_from_row).transpose()
    }

    async fn contestants(&self, contest_id: ContestId) -> Result<Vec<Contestant>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM contestants WHERE contest_id = $1 ORDER BY contest_number",
        )
        .bind(contest_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(contestant_from_row).collect()
    }

    async fn set_contestant_status(
        &self,
        contest_id: ContestId,
        id: ContestantId,
        status: ContestantStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE contestants SET status = $3 WHERE contest_id = $1 AND id = $2")
            .bind(contest_id.as_uuid())
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn create_package(&self, package: &VotePackage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO vote_packages (id, contest_id, name, vote_count, price_cents, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(package.id.as_uuid())
        .bind(package.contest_id.as_uuid())
        .bind(&package.name)
        .bind(i64::from(package.vote_count))
        .bind(money_to_db(package.price)?)
        .bind(package.sort_order)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn packages(&self, contest_id: ContestId) -> Result<Vec<VotePackage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM vote_packages WHERE contest_id = $1 ORDER BY sort_order, name",
        )
        .bind(contest_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(package_from_row).collect()
    }

    async fn create_order(&self, order: &VoteOrder) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO vote_orders
                 (id, user_id, contest_id, package_id, total_amount_cents,
                  platform_fee_cents, vote_count, votes_used, votes_remaining,
                  payment_status, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.contest_id.as_uuid())
        .bind(order.package_id.map(|id| *id.as_uuid()))
        .bind(money_to_db(order.total_amount)?)
        .bind(money_to_db(order.platform_fee)?)
        .bind(i64::from(order.vote_count))
        .bind(i64::from(order.votes_used))
        .bind(i64::from(order.votes_remaining))
        .bind(order.payment_status.as_str())
        .bind(order.expires_at)
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn vote_order(&self, id: VoteOrderId) -> Result<Option<VoteOrder>, StoreError> {
        let row = sqlx::query("SELECT * FROM vote_orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn settle_order(
        &self,
        id: VoteOrderId,
        outcome: PaymentStatus,
    ) -> Result<Option<VoteOrder>, StoreError> {
        // Conditional on the pending state: replayed payment callbacks and
        // double settlements fall through to None.
        let row = sqlx::query(
            "UPDATE vote_orders SET payment_status = $2
             WHERE id = $1 AND payment_status = 'pending'
             RETURNING *",
        )
        .bind(id.as_uuid())
        .bind(outcome.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn voter_history(
        &self,
        contest_id: ContestId,
        contestant_id: ContestantId,
        voter: &Voter,
    ) -> Result<VoterHistory, StoreError> {
        match voter {
            Voter::Guest { ip_address } => {
                let row = sqlx::query(
                    "SELECT EXISTS (
                         SELECT 1 FROM votes
                         WHERE contest_id = $1 AND ip_address = $2 AND user_id IS NULL
                     ) AS voted",
                )
                .bind(contest_id.as_uuid())
                .bind(ip_address)
                .fetch_one(&self.pool)
                .await
                .map_err(storage)?;
                let voted: bool = row.try_get("voted").map_err(storage)?;
                Ok(VoterHistory {
                    guest_voted_in_contest: voted,
                    ..VoterHistory::none()
                })
            }
            Voter::Member { user_id } => {
                let row = sqlx::query(
                    "SELECT
                         COUNT(*) AS total_votes,
                         COUNT(*) FILTER (WHERE kind = 'free') AS free_votes,
                         COUNT(*) FILTER (WHERE kind = 'free' AND contestant_id = $3)
                             AS free_for_contestant
                     FROM votes
                     WHERE contest_id = $1 AND user_id = $2",
                )
                .bind(contest_id.as_uuid())
                .bind(user_id.as_uuid())
                .bind(contestant_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(storage)?;
                let total: i64 = row.try_get("total_votes").map_err(storage)?;
                let free: i64 = row.try_get("free_votes").map_err(storage)?;
                let for_contestant: i64 = row.try_get("free_for_contestant").map_err(storage)?;
                Ok(VoterHistory {
                    total_votes_in_contest: count_from_db(total),
                    free_votes_in_contest: count_from_db(free),
                    voted_free_for_contestant: for_contestant > 0,
                    guest_voted_in_contest: false,
                })
            }
        }
    }

    #[tracing::instrument(skip(self, vote), fields(vote_id = %vote.id))]
    async fn insert_free_vote(
        &self,
        vote: &Vote,
        single_vote_contest: bool,
    ) -> Result<(), StoreError> {
        insert_vote_row(&self.pool, vote, single_vote_contest).await
    }

    #[tracing::instrument(skip(self, vote), fields(vote_id = %vote.id))]
    async fn insert_paid_vote(
        &self,
        vote: &Vote,
        order_id: VoteOrderId,
        single_vote_contest: bool,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Guarded decrement; zero affected rows means the order is spent
        // (or a concurrent cast just took the last vote).
        let decremented = sqlx::query(
            "UPDATE vote_orders
             SET votes_used = votes_used + 1, votes_remaining = votes_remaining - 1
             WHERE id = $1 AND votes_remaining > 0",
        )
        .bind(order_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        if decremented.rows_affected() == 0 {
            return Err(StoreError::VotesExhausted);
        }

        insert_vote_row(&mut *tx, vote, single_vote_contest).await?;

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn vote_tallies(
        &self,
        contest_id: ContestId,
    ) -> Result<HashMap<ContestantId, u64>, StoreError> {
        let rows = sqlx::query(
            "SELECT contestant_id, COUNT(*) AS votes
             FROM votes WHERE contest_id = $1
             GROUP BY contestant_id",
        )
        .bind(contest_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut tallies = HashMap::with_capacity(rows.len());
        for row in &rows {
            let contestant_id = ContestantId::from_uuid(
                row.try_get("contestant_id").map_err(storage)?,
            );
            let votes: i64 = row.try_get("votes").map_err(storage)?;
            tallies.insert(contestant_id, u64::try_from(votes).unwrap_or(0));
        }
        Ok(tallies)
    }

    async fn votes_for_contest(&self, contest_id: ContestId) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query("SELECT * FROM votes WHERE contest_id = $1 ORDER BY cast_at")
            .bind(contest_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(vote_from_row).collect()
    }

    async fn revenue_totals(&self, contest_id: ContestId) -> Result<RevenueTotals, StoreError> {
        let row = sqlx::query(
            "SELECT
                 COALESCE(SUM(total_amount_cents), 0)::BIGINT AS gross,
                 COALESCE(SUM(platform_fee_cents), 0)::BIGINT AS fees
             FROM vote_orders
             WHERE contest_id = $1 AND payment_status = 'completed'",
        )
        .bind(contest_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        let gross: i64 = row.try_get("gross").map_err(storage)?;
        let fees: i64 = row.try_get("fees").map_err(storage)?;
        Ok(RevenueTotals {
            gross: money_from_db(gross),
            fees: money_from_db(fees),
        })
    }
}
