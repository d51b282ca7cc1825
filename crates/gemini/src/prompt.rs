//! Instruction and prompt texts sent to the model.

use chrono::NaiveDate;

/// System instruction, anchored on `today` so the model can complete dates
/// printed without a year or month.
pub fn system_instruction(today: NaiveDate) -> String {
    format!(
        "Please process this receipt slip. Categorize each line item individually based on the \
         line item description. You should also provide a category for the entire slip based on \
         the highest spent category in the line items. If there are no line items, use the name \
         of the merchant to try and determine the category. Provide a very short memo which \
         summarises what products were purchased. Output the transaction date in the format: \
         'YYYY-MM-DD'. If the slip doesn't have the full date, use the current date, which is \
         {}, to try determine the full date. Try to include total taxes paid.",
        today.format("%a %b %d %Y")
    )
}

/// User prompt. Known payees, when given, are listed so the model can reuse
/// an existing merchant name.
pub fn build_prompt(known_payees: Option<&[String]>) -> String {
    let mut prompt = String::from(
        "Process this slip. Make sure you ONLY use a category in the list of available category \
         enum values. ",
    );

    if let Some(payees) = known_payees {
        prompt.push_str(
            "\n\nConsider the following existing merchants and pick the most appropriate one. If \
             none are appropriate, use the merchant name from the receipt:\n",
        );
        let lines: Vec<String> = payees.iter().map(|p| format!("- {p}")).collect();
        prompt.push_str(&lines.join("\n"));
    }

    prompt
}
