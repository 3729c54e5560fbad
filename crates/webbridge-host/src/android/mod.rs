// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android view host via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Architecture notes
//
// `WebView.evaluateJavascript` may only be called on the UI thread, while
// the channel sends from whatever thread the caller is on. Scripts are
// therefore handed to a small Java glue class, `com.webbridge.WebBridgeGlue`,
// whose static `evaluate(WebView, String)` posts the evaluation to the
// view's looper and returns `false` once the view has been destroyed.
//
// The same glue class owns the `@JavascriptInterface` the page posts into.
// It forwards each string to `nativeOnMessage` below, and calls
// `nativeOnDetached` from `WebView.destroy()`. Both land in the process-wide
// sink installed with [`set_inbound_sink`].
//
// Threads attached from native code only see the system class loader, so
// `FindClass` cannot see the glue class from them. The class is resolved
// once in `AndroidWebViewHost::new`, which must run on a Java thread, and
// kept as a global reference.

#![cfg(target_os = "android")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use jni::objects::{GlobalRef, JClass, JString, JValue};
use jni::{JNIEnv, JavaVM};

use webbridge_core::error::{BridgeError, Result};

use crate::traits::{InboundSink, ViewHost};

/// Java glue class, in JNI notation.
const GLUE_CLASS: &str = "com/webbridge/WebBridgeGlue";

/// Signature of `WebBridgeGlue.evaluate(WebView, String): boolean`.
const EVALUATE_SIG: &str = "(Landroid/webkit/WebView;Ljava/lang/String;)Z";

/// Receiver for strings posted by the page. One WebView bridge per process.
static INBOUND_SINK: Mutex<Option<Arc<dyn InboundSink>>> = Mutex::new(None);

/// Install the sink that receives page messages and teardown notices.
pub fn set_inbound_sink(sink: Arc<dyn InboundSink>) {
    *INBOUND_SINK.lock().unwrap_or_else(|p| p.into_inner()) = Some(sink);
}

/// Remove the installed sink, e.g. after the channel has been closed.
pub fn clear_inbound_sink() {
    INBOUND_SINK.lock().unwrap_or_else(|p| p.into_inner()).take();
}

fn current_sink() -> Option<Arc<dyn InboundSink>> {
    INBOUND_SINK.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Convenience: map any `jni::errors::Error` into `BridgeError::Host`.
fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Host(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Host struct
// ---------------------------------------------------------------------------

/// Android implementation of [`ViewHost`] backed by an `android.webkit.WebView`.
pub struct AndroidWebViewHost {
    vm: JavaVM,
    webview: GlobalRef,
    glue_class: GlobalRef,
    attached: AtomicBool,
}

impl AndroidWebViewHost {
    /// Wrap a global reference to the WebView.
    ///
    /// `env` must belong to a Java thread (typically the UI thread creating
    /// the view) so the glue class resolves through the app class loader.
    /// The `JavaVM*` comes from `ndk_context`, which is set by
    /// `android_main` or `ANativeActivity_onCreate`.
    pub fn new(env: &mut JNIEnv, webview: GlobalRef) -> Result<Self> {
        let ctx = ndk_context::android_context();
        // SAFETY: `ctx.vm()` returns the `JavaVM*` set by the NDK glue code.
        // The pointer is valid for the lifetime of the process.
        let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }
            .map_err(|e| BridgeError::Host(format!("failed to obtain JavaVM: {e}")))?;
        let glue_class = resolve_glue_class(env)?;
        Ok(Self {
            vm,
            webview,
            glue_class,
            attached: AtomicBool::new(true),
        })
    }

    /// Record that the WebView is gone; later scripts fail with
    /// `HostDetached` without touching JNI.
    pub fn mark_detached(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

impl ViewHost for AndroidWebViewHost {
    fn name(&self) -> &str {
        "Android WebView"
    }

    fn evaluate_script(&self, script: &str) -> Result<()> {
        if !self.is_attached() {
            return Err(BridgeError::HostDetached);
        }

        // Sending threads are usually long-lived pool threads, so they stay
        // attached instead of paying attach/detach per script.
        let mut env = self
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| jni_err("attach_current_thread", e))?;

        let j_script: JString = env
            .new_string(script)
            .map_err(|e| jni_err("new_string(script)", e))?;

        let glue: &JClass = self.glue_class.as_obj().into();
        let posted = env
            .call_static_method(
                glue,
                "evaluate",
                EVALUATE_SIG,
                &[
                    JValue::Object(self.webview.as_obj()),
                    JValue::Object(&j_script),
                ],
            )
            .map_err(|e| jni_err("WebBridgeGlue.evaluate", e))?
            .z()
            .map_err(|e| jni_err("WebBridgeGlue.evaluate->z", e))?;

        if !posted {
            tracing::info!("Android: WebView destroyed, marking host detached");
            self.mark_detached();
            return Err(BridgeError::HostDetached);
        }

        tracing::trace!(bytes = script.len(), "Android: script posted to UI thread");
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

/// Look up the glue class and pin it with a global reference.
fn resolve_glue_class(env: &mut JNIEnv) -> Result<GlobalRef> {
    let class = env
        .find_class(GLUE_CLASS)
        .map_err(|e| jni_err("find_class(WebBridgeGlue)", e))?;
    env.new_global_ref(class)
        .map_err(|e| jni_err("new_global_ref(WebBridgeGlue)", e))
}

// ---------------------------------------------------------------------------
// JNI entry points called by WebBridgeGlue
// ---------------------------------------------------------------------------

/// `WebBridgeGlue.nativeOnMessage(String)`: a string posted by the page.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_webbridge_WebBridgeGlue_nativeOnMessage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    raw: JString<'local>,
) {
    let raw: String = match env.get_string(&raw) {
        Ok(s) => s.into(),
        Err(e) => {
            tracing::error!(error = %e, "Android: could not read page message");
            return;
        }
    };

    match current_sink() {
        Some(sink) => sink.deliver(&raw),
        None => tracing::warn!(bytes = raw.len(), "Android: page message with no sink installed"),
    }
}

/// `WebBridgeGlue.nativeOnDetached()`: the WebView is being destroyed.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_webbridge_WebBridgeGlue_nativeOnDetached<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    if let Some(sink) = current_sink() {
        sink.detached();
    }
}
