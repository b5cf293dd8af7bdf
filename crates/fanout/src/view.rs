//! What a terminal sees of an order.

use domain::Order;
use order_store::{OrderQuery, OrderStore};

use crate::Result;
use crate::subscription::Interest;

/// Returns the orders a terminal with `interest` starts with.
///
/// `All` sees every order as is; a counter sees each order reduced to its
/// own items, and none of the orders without any.
pub async fn snapshot_for<S>(store: &S, interest: Interest) -> Result<Vec<Order>>
where
    S: OrderStore + ?Sized,
{
    let orders = match interest {
        Interest::All => store.list().await?,
        Interest::Counter(counter_id) => store.query(OrderQuery::for_counter(counter_id)).await?,
    };
    Ok(orders)
}

/// Returns the order as a terminal with `interest` sees it, or `None` if it
/// has nothing for that terminal.
pub fn view_for(order: &Order, interest: Interest) -> Option<Order> {
    match interest {
        Interest::All => Some(order.clone()),
        Interest::Counter(counter_id) => order.view_for_counter(counter_id),
    }
}
