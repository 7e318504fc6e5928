//! CLI commands

use anyhow::{Context, Result, bail};
use bloomkart_core::{CartStore, ClientConfig, FileStore, KeyValueStore, Theme, ThemePreference};
use bloomkart_http::types::{DeliveryDetails, ProductQuery, RegisterRequest};
use bloomkart_http::{BloomKartClient, BloomKartClientBuilder, SessionEvent};
use clap::Subcommand;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,

        #[arg(long, env = "BLOOMKART_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        #[arg(long, env = "BLOOMKART_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Complete a Google sign-in from the redirect URL
    OauthCallback { url: String },

    /// Sign out and clear the local session and cart
    Logout {
        /// Sign out every session of this account
        #[arg(long)]
        all: bool,
    },

    /// Show the signed-in user
    Whoami {
        /// Also fetch the number of active sessions
        #[arg(long)]
        sessions: bool,
    },

    /// Browse the catalog
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },

    /// View and place orders
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// List saved delivery addresses
    Addresses,

    /// Light or dark theme preference
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List one page of products
    List {
        #[arg(long, default_value = "0")]
        page: u32,

        #[arg(long)]
        size: Option<u32>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        min_price: Option<Decimal>,

        #[arg(long)]
        max_price: Option<Decimal>,
    },

    /// Show one product
    Show { id: i64 },

    /// List categories
    Categories,

    /// List featured products
    Featured,
}

#[derive(Subcommand)]
pub enum CartCommands {
    /// Add a product, merging with an existing line
    Add {
        product_id: i64,

        #[arg(default_value = "1")]
        quantity: u32,
    },

    /// Set a line's quantity; 0 removes it
    Set { product_id: i64, quantity: u32 },

    /// Remove a line
    Remove { product_id: i64 },

    /// Empty the cart
    Clear,

    /// Show lines and totals
    Show,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List your orders
    List,

    /// Show one order
    Show { id: i64 },

    /// Place an order for the cart contents
    Place {
        #[arg(long)]
        address: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        pincode: String,

        #[arg(long)]
        phone: String,

        #[arg(long, default_value = "")]
        delivery_date: String,

        #[arg(long, default_value = "")]
        delivery_time: String,

        #[arg(long, default_value = "")]
        instructions: String,
    },
}

#[derive(Subcommand)]
pub enum ThemeCommands {
    Show,
    Set { theme: Theme },
    Toggle,
}

/// Client, cart and theme over one persisted store
struct Storefront {
    client: BloomKartClient,
    cart: CartStore,
    theme: ThemePreference,
}

impl Storefront {
    fn open(config: &ClientConfig) -> Result<Self> {
        let path = config.storage_path();
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::open(&path)
                .with_context(|| format!("Failed to open session store at {}", path.display()))?,
        );
        debug!(path = %path.display(), "Opened session store");

        let client = BloomKartClientBuilder::from_config(config)
            .store(store.clone())
            .build()?;
        let cart = CartStore::new(store.clone()).with_delivery_fee(config.cart.delivery_fee);
        let theme = ThemePreference::new(store);

        Ok(Self {
            client,
            cart,
            theme,
        })
    }
}

impl Commands {
    pub async fn execute(self, config: ClientConfig) -> Result<()> {
        if matches!(self, Self::Config) {
            println!("{}", config::render(&config)?);
            return Ok(());
        }

        let storefront = Storefront::open(&config)?;
        let mut events = storefront.client.session().subscribe();

        let result = self.run(&storefront).await;

        loop {
            match events.try_recv() {
                Ok(SessionEvent::LoginRequired { redirect }) => {
                    info!(%redirect, "Login required");
                    eprintln!("Your session has ended. Sign in again with `bloomkart login`.");
                }
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        result
    }

    async fn run(self, storefront: &Storefront) -> Result<()> {
        let client = &storefront.client;
        match self {
            Self::Login { email, password } => {
                let identity = client.login(&email, &password).await?;
                println!("Signed in as {} <{}> ({})", identity.name, identity.email, identity.role);
                Ok(())
            }
            Self::Register {
                name,
                email,
                phone,
                password,
            } => {
                let identity = client
                    .register(RegisterRequest {
                        name,
                        email,
                        password,
                        phone_number: phone,
                    })
                    .await?;
                println!("Welcome to BloomKart, {}!", identity.name);
                Ok(())
            }
            Self::OauthCallback { url } => {
                let identity = client.adopt_oauth_redirect(&url)?;
                println!("Signed in as {} <{}>", identity.name, identity.email);
                Ok(())
            }
            Self::Logout { all } => {
                let result = if all {
                    client.logout_all().await
                } else {
                    client.logout().await
                };
                println!("Signed out");
                result.context("The server could not be told about the logout")
            }
            Self::Whoami { sessions } => {
                let Some(identity) = client.session().identity() else {
                    println!("Not signed in");
                    return Ok(());
                };
                println!("{} <{}>", identity.name, identity.email);
                println!("  user id: {}", identity.user_id);
                println!("  role:    {}", identity.role);
                if sessions {
                    println!("  active sessions: {}", client.active_sessions().await?);
                }
                Ok(())
            }
            Self::Products { command } => command.run(client).await,
            Self::Cart { command } => command.run(storefront).await,
            Self::Orders { command } => command.run(storefront).await,
            Self::Addresses => {
                let addresses = client.addresses().await?;
                if addresses.is_empty() {
                    println!("No saved addresses");
                }
                for address in addresses {
                    let marker = if address.is_default { "*" } else { " " };
                    println!(
                        "{marker} #{} {} ({}): {}, {}, {} {}",
                        address.id,
                        address.full_name,
                        address.address_type,
                        address.address_line1,
                        address.city,
                        address.state,
                        address.postal_code
                    );
                }
                Ok(())
            }
            Self::Theme { command } => {
                let theme = match command {
                    ThemeCommands::Show => storefront.theme.current()?,
                    ThemeCommands::Set { theme } => storefront.theme.set(theme)?,
                    ThemeCommands::Toggle => storefront.theme.toggle()?,
                };
                println!("{theme}");
                Ok(())
            }
            Self::Config => Ok(()),
        }
    }
}

impl ProductCommands {
    async fn run(self, client: &BloomKartClient) -> Result<()> {
        match self {
            Self::List {
                page,
                size,
                category,
                search,
                min_price,
                max_price,
            } => {
                let query = ProductQuery {
                    page,
                    size,
                    category,
                    search,
                    min_price,
                    max_price,
                };
                let products = client.list_products(&query).await?;
                for product in &products.content {
                    println!(
                        "#{:<5} {:<40} Rs. {}",
                        product.id, product.name, product.price
                    );
                }
                println!(
                    "page {} of {} ({} products)",
                    products.number + 1,
                    products.total_pages.max(1),
                    products.total_elements
                );
                Ok(())
            }
            Self::Show { id } => {
                let product = client.product(id).await?;
                println!("{}", serde_json::to_string_pretty(&product)?);
                let stats = client.review_stats(id).await?;
                println!(
                    "Rated {:.1}/5 from {} reviews",
                    stats.average_rating, stats.total_reviews
                );
                Ok(())
            }
            Self::Categories => {
                for category in client.product_categories().await? {
                    println!("{category}");
                }
                Ok(())
            }
            Self::Featured => {
                for product in client.featured_products().await? {
                    println!("#{:<5} {:<40} Rs. {}", product.id, product.name, product.price);
                }
                Ok(())
            }
        }
    }
}

impl CartCommands {
    async fn run(self, storefront: &Storefront) -> Result<()> {
        let cart = &storefront.cart;
        match self {
            Self::Add {
                product_id,
                quantity,
            } => {
                let product = storefront.client.product(product_id).await?;
                cart.add_item(product.to_cart_item(quantity))?;
                println!(
                    "Added {quantity} x {}; {} in cart",
                    product.name,
                    cart.quantity_of(product_id)?
                );
            }
            Self::Set {
                product_id,
                quantity,
            } => {
                cart.update_quantity(product_id, quantity)?;
            }
            Self::Remove { product_id } => {
                cart.remove_item(product_id)?;
            }
            Self::Clear => {
                cart.clear()?;
                println!("Cart cleared");
                return Ok(());
            }
            Self::Show => {}
        }
        print_cart(cart)
    }
}

fn print_cart(cart: &CartStore) -> Result<()> {
    let items = cart.items()?;
    if items.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for item in &items {
        println!(
            "#{:<5} {:<32} {:>3} x Rs. {:<8} = Rs. {}",
            item.id,
            item.name,
            item.quantity,
            item.price,
            item.line_total()
        );
    }
    println!("Items:    {}", cart.item_count()?);
    println!("Subtotal: Rs. {}", cart.subtotal()?);
    println!("Delivery: Rs. {}", cart.delivery_fee());
    println!("Total:    Rs. {}", cart.total()?);
    Ok(())
}

impl OrderCommands {
    async fn run(self, storefront: &Storefront) -> Result<()> {
        let client = &storefront.client;
        match self {
            Self::List => {
                let orders = client.orders().await?;
                if orders.is_empty() {
                    println!("No orders yet");
                }
                for order in orders {
                    println!(
                        "#{:<6} {:<12} Rs. {}",
                        order.id,
                        order.status.as_deref().unwrap_or("-"),
                        order.total_amount.unwrap_or_default()
                    );
                }
                Ok(())
            }
            Self::Show { id } => {
                let order = client.order(id).await?;
                println!("{}", serde_json::to_string_pretty(&order)?);
                Ok(())
            }
            Self::Place {
                address,
                city,
                state,
                pincode,
                phone,
                delivery_date,
                delivery_time,
                instructions,
            } => {
                if client.session().identity().is_none() {
                    bail!("Sign in before placing an order");
                }
                let details = DeliveryDetails {
                    address,
                    city,
                    state,
                    pincode,
                    phone_number: phone,
                    delivery_date,
                    delivery_time,
                    special_instructions: instructions,
                };
                let order = client
                    .place_order_from_cart(&storefront.cart, details)
                    .await?;
                println!(
                    "Order #{} placed; complete payment to confirm it",
                    order.id
                );
                Ok(())
            }
        }
    }
}
