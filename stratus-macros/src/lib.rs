//! Proc macros for the stratus test harness
//!
//! Provides the `#[stratus::test]` attribute macro for integration tests
//! against remote cloud APIs.

use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, Pat, PatType, ReturnType};

/// Attribute macro for integration tests that create remote resources.
///
/// Wraps the function in `#[tokio::test]` and installs logging. If the test
/// takes a `cleanup: CleanupRegistry` parameter, a fresh registry is injected
/// and run after the test body, whether the body passed, failed or panicked.
///
/// # Example
///
/// ```ignore
/// use stratus::CleanupRegistry;
///
/// #[stratus::test]
/// async fn test_create_volume(cleanup: CleanupRegistry) {
///     let volume = client.create_volume(1).await.unwrap();
///     cleanup.add("delete volume", move || async move { client.delete_volume(&volume.id).await });
///
///     // Test assertions...
/// }
/// ```
///
/// # With Result Return Type
///
/// ```ignore
/// #[stratus::test]
/// async fn test_with_result(cleanup: CleanupRegistry) -> Result<(), Box<dyn std::error::Error>> {
///     let bucket = client.create_bucket("b1").await?;
///     Ok(())
/// }
/// ```
///
/// # What it does
///
/// 1. Initialize tracing output
/// 2. Create an empty `CleanupRegistry`
/// 3. Run the test body, catching panics and returned errors
/// 4. Run the registered cleanup actions, newest first
/// 5. Re-raise the test failure, or fail on a cleanup error if the body passed
///
/// # Environment Variables
///
/// - `STRATUS_KEEP_ALL=true` - Skip cleanup and leave resources for debugging
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = syn::parse_macro_input!(item as ItemFn);
    test_impl(&input_fn).into()
}

/// Check if a function has a parameter named "cleanup"
fn has_cleanup_param(input_fn: &ItemFn) -> bool {
    input_fn.sig.inputs.iter().any(|arg| {
        if let FnArg::Typed(PatType { pat, .. }) = arg {
            if let Pat::Ident(ident) = pat.as_ref() {
                return ident.ident == "cleanup";
            }
        }
        false
    })
}

/// Check if a function has an explicit return type (e.g., `-> Result<...>`)
fn has_result_return(input_fn: &ItemFn) -> bool {
    matches!(&input_fn.sig.output, ReturnType::Type(..))
}

/// Inner implementation that works with `proc_macro2` types for testability
fn test_impl(input_fn: &ItemFn) -> proc_macro2::TokenStream {
    let fn_name = &input_fn.sig.ident;
    let fn_block = &input_fn.block;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_output = &input_fn.sig.output;

    if !has_cleanup_param(input_fn) {
        // No registry needed - logging plus tokio::test
        return quote! {
            #(#fn_attrs)*
            #[tokio::test]
            #fn_vis async fn #fn_name() #fn_output {
                ::stratus::telemetry::init_logging();
                #fn_block
            }
        };
    }

    // The body's own error becomes a message; real panics stay in the unwind payload
    let test_execution = match &input_fn.sig.output {
        ReturnType::Type(_, ret_ty) if has_result_return(input_fn) => quote! {
            let result: #ret_ty = async #fn_block.await;
            result.map_err(|e| format!("test returned error: {:?}", e))
        },
        _ => quote! {
            async #fn_block.await;
            Ok::<(), ::std::string::String>(())
        },
    };

    quote! {
        #(#fn_attrs)*
        #[tokio::test]
        #fn_vis async fn #fn_name() {
            use ::stratus::__private::FutureExt;

            ::stratus::telemetry::init_logging();
            let cleanup = ::stratus::CleanupRegistry::new();

            // Run test and catch any panics
            let outcome = ::std::panic::AssertUnwindSafe(async { #test_execution })
                .catch_unwind()
                .await;

            let teardown = cleanup.teardown().await;

            match (outcome, teardown) {
                (Ok(Ok(())), Ok(())) => {}
                (Ok(Ok(())), Err(e)) => panic!("[stratus] teardown failed: {}", e),
                (Ok(Err(message)), teardown) => {
                    if let Err(e) = teardown {
                        eprintln!("[stratus] Warning: teardown failed: {}", e);
                    }
                    panic!("[stratus] {}", message);
                }
                (Err(panic_info), teardown) => {
                    if let Err(e) = teardown {
                        eprintln!("[stratus] Warning: teardown failed: {}", e);
                    }
                    ::std::panic::resume_unwind(panic_info);
                }
            }
        }
    }
}
