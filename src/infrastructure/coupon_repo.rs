use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::coupon::{normalize_code, Coupon, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;
use crate::schema::coupons;

use super::models::{CouponRow, NewCouponRow};

/// Consumes one use of `coupon_id`, refusing once the usage limit is reached.
pub(crate) fn consume_coupon(conn: &mut PgConnection, coupon_id: Uuid) -> QueryResult<bool> {
    let updated = diesel::update(
        coupons::table.filter(coupons::id.eq(coupon_id)).filter(
            coupons::usage_limit
                .is_null()
                .or(coupons::used_count.nullable().lt(coupons::usage_limit)),
        ),
    )
    .set(coupons::used_count.eq(coupons::used_count + 1))
    .execute(conn)?;
    Ok(updated == 1)
}

pub struct DieselCouponRepository {
    pool: DbPool,
}

impl DieselCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CouponRepository for DieselCouponRepository {
    fn create(&self, coupon: NewCoupon) -> Result<Coupon, DomainError> {
        let mut conn = self.pool.get()?;
        let coupon = coupon.into_coupon(Uuid::new_v4(), Utc::now());

        let inserted = diesel::insert_into(coupons::table)
            .values(&NewCouponRow::from(&coupon))
            .execute(&mut conn);

        match inserted {
            Ok(_) => Ok(coupon),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
                DomainError::invalid_state(format!("coupon {} already exists", coupon.code)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        coupons::table
            .filter(coupons::code.eq(normalize_code(code)))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Coupon::try_from)
            .transpose()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        coupons::table
            .filter(coupons::id.eq(id))
            .select(CouponRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Coupon::try_from)
            .transpose()
    }

    fn list(&self) -> Result<Vec<Coupon>, DomainError> {
        let mut conn = self.pool.get()?;

        coupons::table
            .select(CouponRow::as_select())
            .order(coupons::created_at.desc())
            .load(&mut conn)?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }
}
