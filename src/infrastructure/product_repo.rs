use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{Category, NewProduct, Page, PageRequest, Product, ProductUpdate};
use crate::schema::products;

use super::models::{NewProductRow, ProductChangeset, ProductRow};

/// Guarded `stock += delta` in a single statement.
///
/// Returns the new stock, or `None` if the product does not exist or the
/// result would be negative. Checkout, cancellation and admin adjustments
/// all go through here.
pub(crate) fn apply_stock_delta(
    conn: &mut PgConnection,
    product_id: Uuid,
    delta: i32,
) -> QueryResult<Option<i32>> {
    diesel::update(
        products::table
            .filter(products::id.eq(product_id))
            .filter((products::stock + delta).ge(0)),
    )
    .set((
        products::stock.eq(products::stock + delta),
        products::updated_at.eq(Utc::now()),
    ))
    .returning(products::stock)
    .get_result::<i32>(conn)
    .optional()
}

pub(crate) fn current_stock(conn: &mut PgConnection, product_id: Uuid) -> QueryResult<Option<i32>> {
    products::table
        .filter(products::id.eq(product_id))
        .select(products::stock)
        .first::<i32>(conn)
        .optional()
}

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductRepository for DieselProductRepository {
    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: product.name,
                description: product.description,
                category: product.category.as_str().to_string(),
                price: product.price,
                discount_percentage: product.discount_percentage,
                stock: product.stock,
                weight_grams: product.weight_grams,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        row.try_into()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;

        products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    fn list(
        &self,
        page: PageRequest,
        category: Option<Category>,
    ) -> Result<Page<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count = products::table
                .select(diesel::dsl::count_star())
                .into_boxed();
            let mut query = products::table.into_boxed();
            if let Some(category) = category {
                count = count.filter(products::category.eq(category.as_str()));
                query = query.filter(products::category.eq(category.as_str()));
            }

            let total: i64 = count.get_result(conn)?;
            let rows = query
                .select(ProductRow::as_select())
                .order((products::created_at.desc(), products::id.asc()))
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            Ok(Page {
                items: rows
                    .into_iter()
                    .map(Product::try_from)
                    .collect::<Result<_, _>>()?,
                total,
            })
        })
    }

    fn update(&self, id: Uuid, update: ProductUpdate) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let changeset = ProductChangeset::from(update);

        diesel::update(products::table.filter(products::id.eq(id)))
            .set(&changeset)
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn adjust_stock(&self, id: Uuid, delta: i32) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            if apply_stock_delta(conn, id, delta)?.is_none() {
                return match current_stock(conn, id)? {
                    None => Err(DomainError::not_found("Product")),
                    Some(_) => Err(DomainError::invalid_argument(
                        "stock adjustment would make stock negative",
                    )),
                };
            }

            products::table
                .filter(products::id.eq(id))
                .select(ProductRow::as_select())
                .first(conn)?
                .try_into()
        })
    }
}
