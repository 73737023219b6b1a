use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::VariantSnapshot;
use crate::domain::ports::CatalogRepository;
use crate::schema::{product_variants, products};

use super::models::{ProductRow, VariantRow};

pub(crate) fn variant_snapshot(variant: VariantRow, product: ProductRow) -> VariantSnapshot {
    VariantSnapshot {
        variant_id: variant.id,
        unit_price: product.price + variant.additional_price,
        product_name: product.title,
        size: variant.size,
        stock: variant.stock,
    }
}

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn find_variant(&self, sku: &str, size: &str) -> Result<Option<VariantSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = product_variants::table
            .inner_join(products::table)
            .filter(products::sku.eq(sku))
            .filter(products::is_active.eq(true))
            .filter(product_variants::size.eq(size))
            .select((VariantRow::as_select(), ProductRow::as_select()))
            .first::<(VariantRow, ProductRow)>(&mut conn)
            .optional()?;

        Ok(row.map(|(variant, product)| variant_snapshot(variant, product)))
    }

    fn find_variant_by_id(&self, variant_id: Uuid) -> Result<Option<VariantSnapshot>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = product_variants::table
            .inner_join(products::table)
            .filter(product_variants::id.eq(variant_id))
            .filter(products::is_active.eq(true))
            .select((VariantRow::as_select(), ProductRow::as_select()))
            .first::<(VariantRow, ProductRow)>(&mut conn)
            .optional()?;

        Ok(row.map(|(variant, product)| variant_snapshot(variant, product)))
    }
}
