use std::sync::Arc;

use crate::domain::actor::Actor;
use crate::domain::coupon::{Coupon, NewCoupon};
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponRepository;

#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponRepository>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponRepository>) -> Self {
        Self { coupons }
    }

    pub fn create(&self, actor: &Actor, coupon: NewCoupon) -> Result<Coupon, DomainError> {
        actor.require_admin()?;
        coupon.validate()?;
        let coupon = self.coupons.create(coupon)?;
        log::info!("coupon {} created by {}", coupon.code, actor.user_id);
        Ok(coupon)
    }

    pub fn list(&self, actor: &Actor) -> Result<Vec<Coupon>, DomainError> {
        actor.require_admin()?;
        self.coupons.list()
    }
}
