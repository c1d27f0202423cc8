//! Shop Document Store
//! Mission: Persist products, orders, and reviews with SQLite

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub price_cents: i64,
    /// Units currently available for ordering.
    pub available: i64,
    /// Smallest quantity a single order may carry.
    pub min_order: i64,
}

/// Payload for adding a product to the catalog.
#[derive(Debug, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub price_cents: i64,
    pub available: i64,
    #[serde(default = "default_min_order")]
    pub min_order: i64,
}

fn default_min_order() -> i64 {
    1
}

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "paid")]
    Paid,
    #[serde(rename = "shipped")]
    Shipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            _ => None,
        }
    }
}

/// A placed order, owned by the account that placed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub product_id: String,
    pub email: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub status: OrderStatus,
    pub created_at: String,
}

/// A product review left by an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub email: String,
    pub name: String,
    pub rating: i64,
    pub text: String,
    pub created_at: String,
}

/// Storefront storage with SQLite backend.
pub struct ShopStore {
    db_path: String,
}

impl ShopStore {
    /// Create a new shop store and initialize the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                image TEXT NOT NULL,
                price_cents INTEGER NOT NULL,
                available INTEGER NOT NULL,
                min_order INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                product_id TEXT NOT NULL,
                email TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                unit_price_cents INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                rating INTEGER NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // ── Products ─────────────────────────────────────────────────────────

    pub fn list_products(&self) -> Result<Vec<Product>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, description, image, price_cents, available, min_order
             FROM products ORDER BY name",
        )?;

        let products = stmt
            .query_map([], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    image: row.get(3)?,
                    price_cents: row.get(4)?,
                    available: row.get(5)?,
                    min_order: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    pub fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let conn = Connection::open(&self.db_path)?;

        let row = conn.query_row(
            "SELECT id, name, description, image, price_cents, available, min_order
             FROM products WHERE id = ?1",
            params![id],
            |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    image: row.get(3)?,
                    price_cents: row.get(4)?,
                    available: row.get(5)?,
                    min_order: row.get(6)?,
                })
            },
        );

        match row {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_product(&self, new: NewProduct) -> Result<Product> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            image: new.image,
            price_cents: new.price_cents,
            available: new.available,
            min_order: new.min_order,
        };

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO products (id, name, description, image, price_cents, available, min_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                product.id,
                product.name,
                product.description,
                product.image,
                product.price_cents,
                product.available,
                product.min_order,
            ],
        )
        .context("Failed to insert product")?;

        info!("Added product '{}' ({})", product.name, product.id);

        Ok(product)
    }

    /// Set the available count. Returns false if the product is missing.
    pub fn set_product_available(&self, id: &str, available: i64) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;

        let updated = conn.execute(
            "UPDATE products SET available = ?1 WHERE id = ?2",
            params![available, id],
        )?;

        Ok(updated > 0)
    }

    /// Delete a product. Returns false if the product is missing.
    pub fn delete_product(&self, id: &str) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;

        let deleted = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;

        if deleted > 0 {
            info!("Deleted product {}", id);
        }

        Ok(deleted > 0)
    }

    // ── Orders ───────────────────────────────────────────────────────────

    pub fn insert_order(
        &self,
        product_id: &str,
        email: &str,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Result<Order> {
        let order = Order {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            email: email.to_string(),
            quantity,
            unit_price_cents,
            status: OrderStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO orders (id, product_id, email, quantity, unit_price_cents, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order.id,
                order.product_id,
                order.email,
                order.quantity,
                order.unit_price_cents,
                order.status.as_str(),
                order.created_at,
            ],
        )
        .context("Failed to insert order")?;

        info!("Order {} placed by {}", order.id, order.email);

        Ok(order)
    }

    pub fn get_order(&self, id: &str) -> Result<Option<Order>> {
        let conn = Connection::open(&self.db_path)?;

        let row = conn.query_row(
            "SELECT id, product_id, email, quantity, unit_price_cents, status, created_at
             FROM orders WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        );

        match row {
            Ok(raw) => Ok(Some(order_from_row(raw))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn orders_for_email(&self, email: &str) -> Result<Vec<Order>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, product_id, email, quantity, unit_price_cents, status, created_at
             FROM orders WHERE email = ?1 ORDER BY created_at DESC",
        )?;

        let orders = stmt
            .query_map(params![email], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(orders.into_iter().map(order_from_row).collect())
    }

    /// Delete an order. Returns false if the order is missing.
    pub fn delete_order(&self, id: &str) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;

        let deleted = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;

        if deleted > 0 {
            info!("Order {} cancelled", id);
        }

        Ok(deleted > 0)
    }

    /// Update an order's status. Returns false if the order is missing.
    pub fn set_order_status(&self, id: &str, status: OrderStatus) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;

        let updated = conn.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;

        Ok(updated > 0)
    }

    // ── Reviews ──────────────────────────────────────────────────────────

    pub fn list_reviews(&self, limit: i64) -> Result<Vec<Review>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, name, rating, text, created_at
             FROM reviews ORDER BY created_at DESC LIMIT ?1",
        )?;

        let reviews = stmt
            .query_map(params![limit], |row| {
                Ok(Review {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    rating: row.get(3)?,
                    text: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reviews)
    }

    pub fn insert_review(
        &self,
        email: &str,
        name: &str,
        rating: i64,
        text: &str,
    ) -> Result<Review> {
        let review = Review {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            rating,
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO reviews (id, email, name, rating, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                review.id,
                review.email,
                review.name,
                review.rating,
                review.text,
                review.created_at,
            ],
        )
        .context("Failed to insert review")?;

        Ok(review)
    }
}

fn order_from_row(
    (id, product_id, email, quantity, unit_price_cents, status, created_at): (
        String,
        String,
        String,
        i64,
        i64,
        String,
        String,
    ),
) -> Order {
    Order {
        id,
        product_id,
        email,
        quantity,
        unit_price_cents,
        // Unknown stored status degrades to pending rather than failing the read.
        status: OrderStatus::from_str(&status).unwrap_or(OrderStatus::Pending),
        created_at,
    }
}
