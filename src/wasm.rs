#![cfg(target_arch = "wasm32")]

use gloo_net::http::Request;
use leptos::*;
use std::collections::HashMap;
use tracing::warn;
use wasm_bindgen::JsValue;

use crate::quiz::{Grade, percentage, question_count};
use crate::{
    Config, GenerationError, GenerationRequest, GenerationTransport, Outcome, PersistenceError,
    Quiz, QuizGenerator, QuizLibrary, QuizResult, QuizSession, SessionSlot, SessionStats,
    StorageBackend, parse_quiz, render_quiz_text, same_choice,
};

const FORMAT_GUIDE: &str = "My Quiz Title

1. Question text here?
a) Option one
b) Option two
**Answer: b) Option two**";

/// Browser `localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageBackend;

fn backend_error(key: &str, error: JsValue) -> PersistenceError {
    PersistenceError::Backend {
        key: key.to_string(),
        reason: format!("{error:?}"),
    }
}

fn local_storage(key: &str) -> Result<web_sys::Storage, PersistenceError> {
    let unavailable = || PersistenceError::Backend {
        key: key.to_string(),
        reason: "localStorage is not available".to_string(),
    };

    web_sys::window()
        .ok_or_else(unavailable)?
        .local_storage()
        .map_err(|error| backend_error(key, error))?
        .ok_or_else(unavailable)
}

impl StorageBackend for LocalStorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        local_storage(key)?
            .get_item(key)
            .map_err(|error| backend_error(key, error))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        local_storage(key)?
            .set_item(key, value)
            .map_err(|error| backend_error(key, error))
    }
}

/// Posts generation requests with `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

fn transport_error(error: gloo_net::Error) -> GenerationError {
    GenerationError::Transport {
        reason: error.to_string(),
    }
}

impl GenerationTransport for GlooTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = Request::post(&request.url)
            .header("x-goog-api-key", &request.api_key)
            .json(&request.body)
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;

        if !response.ok() {
            return Err(GenerationError::Transport {
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.text().await.map_err(transport_error)
    }
}

/// Who is using the app. Authoring actions are only offered to authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionContext {
    pub author: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    List,
    Create,
    Edit(String),
    Take(String),
    Stats,
}

fn app_config() -> Config {
    let mut config = Config::default();
    config.generator.api_key = option_env!("QUIZMASTER_API_KEY").map(str::to_string);
    config
}

#[component]
fn QuizList(
    quizzes: ReadSignal<Vec<Quiz>>,
    context: ReadSignal<SessionContext>,
    on_take: Callback<String>,
    on_edit: Callback<String>,
    on_delete: Callback<String>,
) -> impl IntoView {
    view! {
        <section class="quiz-list">
            {move || {
                let items = quizzes.get();
                if items.is_empty() {
                    return view! { <p class="lede">"No quizzes available yet."</p> }.into_view();
                }

                items
                    .into_iter()
                    .map(|quiz| {
                        let take_id = quiz.id.clone();
                        let edit_id = quiz.id.clone();
                        let delete_id = quiz.id.clone();

                        view! {
                            <article class="quiz-card">
                                <h2 class="quiz-title">{quiz.title.clone()}</h2>
                                <p class="lede">{quiz.summary()}</p>
                                <p class="meta">
                                    {format!(
                                        "{}, added {}",
                                        question_count(quiz.questions.len()),
                                        quiz.created_at.format("%Y-%m-%d"),
                                    )}
                                </p>
                                <div class="card-actions">
                                    <button class="primary" on:click=move |_| on_take.call(take_id.clone())>
                                        "Start quiz"
                                    </button>
                                    {move || {
                                        let edit_id = edit_id.clone();
                                        let delete_id = delete_id.clone();
                                        context.get().author.then(move || view! {
                                            <button class="pill" on:click=move |_| on_edit.call(edit_id.clone())>
                                                "Edit"
                                            </button>
                                            <button class="pill danger" on:click=move |_| on_delete.call(delete_id.clone())>
                                                "Delete"
                                            </button>
                                        })
                                    }}
                                </div>
                            </article>
                        }
                    })
                    .collect_view()
            }}
        </section>
    }
}

#[component]
fn QuizEditor(
    initial: Option<Quiz>,
    on_save: Callback<Quiz>,
    on_cancel: Callback<()>,
) -> impl IntoView {
    let editing = initial.is_some();
    let (text, set_text) = create_signal(initial.as_ref().map(render_quiz_text).unwrap_or_default());
    let (topic, set_topic) = create_signal(String::new());
    let (error, set_error) = create_signal::<Option<String>>(None);
    let (loading, set_loading) = create_signal(false);
    let existing = store_value(initial);

    let parse = move |_| {
        set_error.set(None);
        let parsed = existing.with_value(|existing| parse_quiz(&text.get_untracked(), existing.as_ref()));
        match parsed {
            Ok(parsed) => on_save.call(parsed.into_quiz()),
            Err(parse_error) => set_error.set(Some(parse_error.to_string())),
        }
    };

    let generate = move |_| {
        let requested = topic.get_untracked();
        if requested.trim().is_empty() {
            return;
        }

        set_loading.set(true);
        set_error.set(None);
        wasm_bindgen_futures::spawn_local(async move {
            let generator = QuizGenerator::new(GlooTransport, app_config().generator);
            let generated = generator.generate(&requested).await;
            set_loading.set(false);

            match generated {
                Ok(quiz) => on_save.call(quiz),
                Err(_) => set_error.set(Some(GenerationError::USER_MESSAGE.to_string())),
            }
        });
    };

    view! {
        <section class="editor">
            {move || error.get().map(|message| view! {
                <div class="error-card">
                    <p class="error-body">{message}</p>
                </div>
            })}
            <div class="format-guide">
                <p class="eyebrow">"Format guide"</p>
                <pre>{FORMAT_GUIDE}</pre>
            </div>
            <textarea
                class="quiz-text"
                placeholder="Paste your quiz content here..."
                prop:value=move || text.get()
                on:input=move |ev| set_text.set(event_target_value(&ev))
            ></textarea>
            <div class="editor-actions">
                <button class="pill" on:click=move |_| on_cancel.call(())>"Cancel"</button>
                <button class="primary" disabled=move || text.get().trim().is_empty() on:click=parse>
                    {if editing { "Update quiz" } else { "Create quiz" }}
                </button>
            </div>
            {(!editing).then(move || view! {
                <div class="generator">
                    <p class="eyebrow">"Generate with AI"</p>
                    <input
                        type="text"
                        placeholder="e.g., European history"
                        prop:value=move || topic.get()
                        on:input=move |ev| set_topic.set(event_target_value(&ev))
                    />
                    <button
                        class="primary"
                        disabled=move || loading.get() || topic.get().trim().is_empty()
                        on:click=generate
                    >
                        {move || if loading.get() { "Generating..." } else { "Generate quiz" }}
                    </button>
                </div>
            })}
        </section>
    }
}

fn option_class(submitted: bool, selected: bool, correct: bool) -> &'static str {
    match (submitted, selected, correct) {
        (true, _, true) => "option correct",
        (true, true, false) => "option wrong",
        (true, false, false) => "option muted",
        (false, true, _) => "option selected",
        (false, false, _) => "option",
    }
}

fn summary_view(session: &QuizSession, on_exit: Callback<()>) -> View {
    let total = session.total();
    let score = session.score();
    let percent = percentage(score, total);

    view! {
        <div class="result-overlay">
            <h2 class="headline">{Grade::from_percentage(percent).to_string()}</h2>
            <p class="lede">{format!("You scored {score} out of {total}")}</p>
            <p class="value">{format!("{percent}%")}</p>
            <button class="pill" on:click=move |_| on_exit.call(())>"Back to list"</button>
        </div>
    }
    .into_view()
}

fn session_view(
    session: &QuizSession,
    slot: RwSignal<SessionSlot>,
    on_complete: Callback<QuizResult>,
    on_exit: Callback<()>,
) -> View {
    let submitted = session.is_submitted();
    let outcomes: HashMap<String, Outcome> = session
        .review()
        .into_iter()
        .map(|review| (review.question_id, review.outcome))
        .collect();

    let cards = session
        .questions()
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected = session.selection(&question.id).map(str::to_string);
            let outcome = outcomes.get(&question.id).copied();

            let options = question
                .options
                .iter()
                .map(|option| {
                    let class = option_class(
                        submitted,
                        selected.as_deref() == Some(option.as_str()),
                        same_choice(option, &question.correct_answer),
                    );
                    let question_id = question.id.clone();
                    let choice = option.clone();

                    view! {
                        <button
                            class=class
                            disabled=submitted
                            on:click=move |_| {
                                slot.update(|slot| {
                                    if let Some(session) = slot.current_mut() {
                                        if let Err(error) = session.select(&question_id, &choice) {
                                            warn!(%error, "selection rejected");
                                        }
                                    }
                                });
                            }
                        >
                            {option.clone()}
                        </button>
                    }
                })
                .collect_view();

            let (card_class, status) = match outcome {
                Some(Outcome::Correct) => ("question-card correct", Some("Correct")),
                Some(Outcome::Incorrect) => ("question-card wrong", Some("Incorrect")),
                Some(Outcome::Unanswered) => ("question-card wrong", Some("Not answered")),
                None => ("question-card", None),
            };
            let hint = (submitted && outcome != Some(Outcome::Correct))
                .then(|| format!("Correct answer: {}", question.correct_answer));

            view! {
                <article class=card_class>
                    <h3 class="prompt">
                        <span class="option-index">{format!("{}.", index + 1)}</span>
                        {question.text.clone()}
                    </h3>
                    {status.map(|status| view! { <p class="status">{status}</p> })}
                    <div class="options-grid">{options}</div>
                    {hint.map(|hint| view! { <p class="hint">{hint}</p> })}
                </article>
            }
        })
        .collect_view();

    let submit = (!submitted).then(|| {
        let label = if session.is_complete() {
            "Submit quiz".to_string()
        } else {
            format!(
                "Submit quiz ({}/{} answered)",
                session.answered(),
                session.total()
            )
        };

        view! {
            <button
                class="primary submit"
                on:click=move |_| {
                    let mut completed = None;
                    slot.update(|slot| {
                        if let Some(session) = slot.current_mut() {
                            completed = session.submit().ok();
                        }
                    });
                    if let Some(result) = completed {
                        on_complete.call(result);
                    }
                }
            >
                {label}
            </button>
        }
    });

    view! {
        <section class="quiz-taker">
            <h2 class="headline">{session.quiz_title().to_string()}</h2>
            {submitted.then(|| summary_view(session, on_exit))}
            {cards}
            {submit}
        </section>
    }
    .into_view()
}

#[component]
fn QuizTaker(
    quiz: Quiz,
    slot: RwSignal<SessionSlot>,
    on_complete: Callback<QuizResult>,
    on_exit: Callback<()>,
) -> impl IntoView {
    let mut start_error = None;
    slot.update(|slot| {
        if let Err(error) = slot.take(&mut rand::thread_rng(), &quiz) {
            start_error = Some(error.to_string());
        }
    });

    view! {
        {start_error.map(|message| view! { <p class="error-body">{message}</p> })}
        {move || slot.with(|current| {
            current
                .current()
                .map(|session| session_view(session, slot, on_complete, on_exit))
        })}
    }
}

#[component]
fn StatsPanel(results: ReadSignal<Vec<QuizResult>>) -> impl IntoView {
    view! {
        <section class="status-panel">
            {move || {
                let stats = SessionStats::from_results(&results.get());
                if stats.is_empty() {
                    return view! { <p class="lede">"Take a quiz to see your session stats."</p> }.into_view();
                }

                view! {
                    <div class="status-item">
                        <p class="label">"Quizzes taken"</p>
                        <p class="value">{stats.total_taken}</p>
                    </div>
                    <div class="status-item">
                        <p class="label">"Accuracy"</p>
                        <p class="value">{format!("{}%", stats.overall_accuracy)}</p>
                    </div>
                    <div class="status-item">
                        <p class="label">"Perfect scores"</p>
                        <p class="value">{stats.perfect_scores}</p>
                    </div>
                    <ul class="history">
                        {stats
                            .history
                            .into_iter()
                            .map(|entry| view! {
                                <li title=entry.full_title>{format!("{}: {}%", entry.name, entry.percentage)}</li>
                            })
                            .collect_view()}
                    </ul>
                }
                .into_view()
            }}
        </section>
    }
}

#[component]
fn App() -> impl IntoView {
    let config = app_config();
    let library = store_value(QuizLibrary::open(LocalStorageBackend, config.storage_key));
    let (quizzes, set_quizzes) =
        create_signal(library.with_value(|library| library.quizzes().to_vec()));
    let (screen, set_screen) = create_signal(Screen::List);
    let (results, set_results) = create_signal(Vec::<QuizResult>::new());
    let (context, set_context) = create_signal(SessionContext::default());
    let slot = create_rw_signal(SessionSlot::new());

    let refresh = move || set_quizzes.set(library.with_value(|library| library.quizzes().to_vec()));

    let on_save = Callback::new(move |quiz: Quiz| {
        library.update_value(|library| {
            library.upsert(quiz);
        });
        refresh();
        set_screen.set(Screen::List);
    });
    let on_delete = Callback::new(move |id: String| {
        library.update_value(|library| {
            library.remove(&id);
        });
        refresh();
    });
    let on_take = Callback::new(move |id: String| {
        slot.update(SessionSlot::clear);
        set_screen.set(Screen::Take(id));
    });
    let on_edit = Callback::new(move |id: String| set_screen.set(Screen::Edit(id)));
    let on_cancel = Callback::new(move |_: ()| set_screen.set(Screen::List));
    let on_complete = Callback::new(move |result: QuizResult| {
        set_results.update(|results| results.push(result));
    });
    let on_exit = Callback::new(move |_: ()| {
        slot.update(SessionSlot::clear);
        set_screen.set(Screen::List);
    });

    view! {
        <main class="page">
            <header class="page-header">
                <h1 class="headline">"QuizMaster"</h1>
                <nav class="header-actions">
                    <button class="pill" on:click=move |_| set_screen.set(Screen::List)>
                        "Available quizzes"
                    </button>
                    <button class="pill" on:click=move |_| set_screen.set(Screen::Stats)>
                        "Session stats"
                    </button>
                    {move || context.get().author.then(|| view! {
                        <button class="primary" on:click=move |_| set_screen.set(Screen::Create)>
                            "Create quiz"
                        </button>
                    })}
                    <button class="pill" on:click=move |_| set_context.update(|context| context.author = !context.author)>
                        {move || if context.get().author { "Author mode" } else { "Student mode" }}
                    </button>
                </nav>
            </header>

            {move || match screen.get() {
                Screen::List => view! {
                    <QuizList
                        quizzes=quizzes
                        context=context
                        on_take=on_take
                        on_edit=on_edit
                        on_delete=on_delete
                    />
                }
                .into_view(),
                Screen::Create => view! {
                    <QuizEditor initial=None on_save=on_save on_cancel=on_cancel />
                }
                .into_view(),
                Screen::Edit(id) => {
                    let initial = library.with_value(|library| library.get(&id).cloned());
                    view! { <QuizEditor initial=initial on_save=on_save on_cancel=on_cancel /> }
                        .into_view()
                }
                Screen::Take(id) => match library.with_value(|library| library.get(&id).cloned()) {
                    Some(quiz) => view! {
                        <QuizTaker quiz=quiz slot=slot on_complete=on_complete on_exit=on_exit />
                    }
                    .into_view(),
                    None => view! { <p class="error-body">"Quiz not found"</p> }.into_view(),
                },
                Screen::Stats => view! { <StatsPanel results=results /> }.into_view(),
            }}
        </main>
    }
}

/// Mounts the app on the document body.
pub fn mount() {
    console_error_panic_hook::set_once();
    crate::logging::init_line_logging(|line| web_sys::console::log_1(&JsValue::from_str(line)));
    mount_to_body(|| view! { <App /> });
}
