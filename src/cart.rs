//! Client-session cart: a pure in-memory aggregate keyed by
//! `(product_id, selected_size)`. Lines snapshot price and discount at add
//! time, so later catalog changes do not alter what is already in the cart.

use crate::db::models::Product;
use crate::models::Discount;

#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: i32,
    pub selected_size: String,
    pub quantity: u32,
    pub title: String,
    pub image: String,
    pub category: String,
    pub sizes: Vec<String>,
    pub price: f64,
    pub discount: Discount,
}

impl CartLine {
    /// Discount precedence: a non-zero percentage wins over a flat amount.
    /// Rounding to the nearest whole currency unit happens per unit, before
    /// multiplying by quantity.
    pub fn unit_price(&self) -> f64 {
        if self.discount.percentage > 0.0 {
            (self.price - self.price * self.discount.percentage / 100.0).round()
        } else if self.discount.amount > 0.0 {
            (self.price - self.discount.amount).round()
        } else {
            self.price
        }
    }

    pub fn total(&self) -> f64 {
        self.unit_price() * f64::from(self.quantity)
    }
}

#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    adjustment: f64,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Increments an existing `(product, size)` line, or appends a new one
    /// with a price/discount snapshot taken now.
    pub fn add_item(&mut self, product: &Product, size: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(index) = self.position(product.id, size) {
            self.lines[index].quantity += quantity;
            return;
        }
        self.lines.push(CartLine {
            product_id: product.id,
            selected_size: size.to_string(),
            quantity,
            title: product.title.clone(),
            image: product.src_url.clone(),
            category: product.category.clone(),
            sizes: product.sizes.clone(),
            price: product.price,
            discount: Discount {
                amount: product.discount_amount,
                percentage: product.discount_percentage,
            },
        });
    }

    /// Decrements by one; the line disappears at zero. Absent keys are a
    /// no-op.
    pub fn decrement_item(&mut self, product_id: i32, size: &str) {
        if let Some(index) = self.position(product_id, size) {
            if self.lines[index].quantity <= 1 {
                self.lines.remove(index);
            } else {
                self.lines[index].quantity -= 1;
            }
        }
    }

    pub fn remove_item(&mut self, product_id: i32, size: &str) {
        if let Some(index) = self.position(product_id, size) {
            self.lines.remove(index);
        }
    }

    /// External adjustment (shipping, promo); the policy that computes it
    /// is out of scope here.
    pub fn set_adjustment(&mut self, adjustment: f64) {
        self.adjustment = adjustment;
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::total).sum::<f64>() + self.adjustment
    }

    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    fn position(&self, product_id: i32, size: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id && line.selected_size == size)
    }
}
