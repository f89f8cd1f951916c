use axum::{
    handler::Handler,
    routing::{get, post, MethodRouter},
    Router,
};

/// Merges route components into one router and attaches the state.
pub fn main_router<STATE>(components: Vec<(String, Router<STATE>)>, state: STATE) -> Router
where
    STATE: Clone + Send + Sync + 'static,
{
    let mut app = Router::<STATE>::new();

    for (_, router) in components {
        app = app.merge(router);
    }

    app.with_state(state)
}

/// One path served by several methods, e.g. `get(a).post(b)`.
pub fn route_builder<S>(path: &str, method_router: MethodRouter<S>) -> (String, Router<S>)
where
    S: Clone + Send + Sync + 'static,
{
    (path.to_string(), Router::<S>::new().route(path, method_router))
}

pub fn get_router_builder<T, S>(
    path: &str,
    handler: impl Handler<T, S> + Clone + Send + 'static,
) -> (String, Router<S>)
where
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    route_builder(path, get(handler))
}

pub fn post_router_builder<T, S>(
    path: &str,
    handler: impl Handler<T, S> + Clone + Send + 'static,
) -> (String, Router<S>)
where
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    route_builder(path, post(handler))
}
