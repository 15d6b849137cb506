//! Terminal output.
//!
//! Results go to stdout, failures to stderr. Formatting lives in plain
//! functions so it can be tested without capturing the terminal.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write as _;

use eazybuy_core::{Cart, Product, Quantity};

use crate::commands::products::SeedOutcome;

pub fn products(products: &[Product]) {
    println!("{}", format_products(products));
}

pub fn product(product: &Product) {
    println!("{}", format_product(product));
}

pub fn cart(cart: &Cart) {
    println!("{}", format_cart(cart));
}

pub fn count(count: u64) {
    println!("{count}");
}

pub fn added(quantity: Quantity) {
    if quantity == Quantity::ONE {
        println!("Product added to cart!");
    } else {
        println!("{quantity} item(s) added to cart!");
    }
}

pub fn seed_outcome(name: &str, outcome: &SeedOutcome) {
    match outcome {
        SeedOutcome::Created(id) => println!("Created product: {name} (#{id})"),
        SeedOutcome::AlreadyExists => println!("Product already exists: {name}"),
    }
}

pub fn failure(message: &str) {
    eprintln!("error: {message}");
}

fn format_products(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products found.".to_string();
    }

    let width = products.iter().map(|p| p.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:>10}",
            product.id,
            product.name,
            product.unit_price().display()
        );
    }
    out.trim_end().to_string()
}

fn format_product(product: &Product) -> String {
    let mut out = format!(
        "#{} {}\nPrice: {}",
        product.id,
        product.name,
        product.unit_price().display()
    );
    if let Some(image) = &product.image {
        let _ = write!(out, "\nImage: {image}");
    }
    out
}

fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Your cart is empty.".to_string();
    }

    let width = cart
        .items
        .iter()
        .map(|item| item.product.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for item in &cart.items {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:>3} x {:>10}  {:>10}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.product.unit_price().display(),
            item.line_total().display()
        );
    }

    let total = cart.total_price().display();
    let _ = writeln!(out, "\nItems:    {}", cart.item_count());
    let _ = writeln!(out, "Subtotal: {total}");
    let _ = writeln!(out, "Shipping: Free");
    let _ = writeln!(out, "Tax:      $0.00");
    let _ = write!(out, "Total:    {total}");
    out
}
