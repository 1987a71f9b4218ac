#![allow(non_snake_case)]

mod api;

use dioxus::prelude::*;
use orbit_api_schema::{error::ApiErrorCode, workspace::list::ListWorkspacesResponse};
use orbit_dashboard::{
    create_dialog::CreateWorkspaceDialog,
    query::{QueryCache, QueryKey},
    toast::{Toast, ToastKind},
};
use tracing::Level;

type WorkspaceCache = Signal<QueryCache<ListWorkspacesResponse>>;

#[derive(Clone, Routable, Debug, PartialEq)]
enum Route {
    #[route("/")]
    Home {},
}

fn main() {
    // Init logger
    dioxus_logger::init(Level::INFO).expect("failed to init logger");
    launch(App);
}

fn App() -> Element {
    use_context_provider(|| Signal::new(QueryCache::<ListWorkspacesResponse>::new()));
    use_context_provider(|| Signal::new(Vec::<Toast>::new()));
    rsx! {
        Router::<Route> {}
    }
}

#[component]
fn Home() -> Element {
    rsx! {
        div { class: "dashboard",
            WorkspaceRail {}
            Toasts {}
        }
    }
}

#[component]
fn WorkspaceRail() -> Element {
    let mut cache = use_context::<WorkspaceCache>();
    let list = use_resource(move || async move {
        let key = QueryKey::workspace_list();
        // Subscribes the resource to invalidations of the list.
        let _version = cache.read().version(&key);
        if let Some(cached) = cache.peek().get(&key).cloned() {
            return Ok(cached);
        }
        let res = api::list_workspaces().await?;
        cache.write().store(key, res.clone());
        Ok::<_, ApiErrorCode>(res)
    });

    match &*list.read_unchecked() {
        Some(Ok(res)) => {
            let current = res.current_workspace.org_code.clone();
            rsx! {
                nav { class: "rail",
                    {res.workspaces.iter().map(|workspace| {
                        let class = if workspace.id == current {
                            "avatar current"
                        } else {
                            "avatar"
                        };
                        rsx! {
                            div {
                                key: "{workspace.id}",
                                class: "{class}",
                                title: "{workspace.name}",
                                "{workspace.avatar}"
                            }
                        }
                    })}
                    CreateWorkspace {}
                }
            }
        }
        Some(Err(code)) => rsx! {
            p { class: "error", "Could not load workspaces: {code}" }
        },
        None => rsx! {
            p { "Loading..." }
        },
    }
}

#[component]
fn CreateWorkspace() -> Element {
    let mut cache = use_context::<WorkspaceCache>();
    let mut toasts = use_context::<Signal<Vec<Toast>>>();
    let mut dialog = use_signal(CreateWorkspaceDialog::new);

    let submit = move |_: FormEvent| {
        let Some(input) = dialog.write().submit() else {
            return;
        };
        spawn(async move {
            let result = api::create_workspace(&input).await;
            dialog
                .write()
                .complete(result, &mut *cache.write(), &mut *toasts.write());
        });
    };

    let state = dialog.read();
    rsx! {
        button { class: "avatar add", onclick: move |_| dialog.write().open(), "+" }
        if state.is_open() {
            form { class: "dialog", prevent_default: "onsubmit", onsubmit: submit,
                h2 { "Create workspace" }
                input {
                    value: "{state.name()}",
                    placeholder: "Workspace name",
                    oninput: move |evt: FormEvent| dialog.write().set_name(&evt.value()),
                }
                if let Some(err) = state.name_error() {
                    p { class: "error", "{err}" }
                }
                button { r#type: "submit", disabled: state.is_pending(),
                    if state.is_pending() { "Creating..." } else { "Create" }
                }
                button { r#type: "button", onclick: move |_| dialog.write().close(), "Cancel" }
            }
        }
    }
}

#[component]
fn Toasts() -> Element {
    let mut toasts = use_context::<Signal<Vec<Toast>>>();
    let items: Vec<(usize, Toast)> = toasts.read().iter().cloned().enumerate().collect();
    rsx! {
        div { class: "toasts",
            for (i, toast) in items {
                div {
                    key: "{i}",
                    class: match toast.kind {
                        ToastKind::Success => "toast success",
                        ToastKind::Error => "toast error",
                    },
                    "{toast.message}"
                    button {
                        onclick: move |_| {
                            toasts.write().remove(i);
                        },
                        "x"
                    }
                }
            }
        }
    }
}
