//! Canned continuations appended after a creation step. Each one contains
//! "Next, let's" so a response that already carries it is never extended
//! twice.

pub const CREATE_OBJECTIVE: &str = "\n\n**STEP 2: Create an Objective**\n\
Next, let's define an objective for this OKR session. Based on what you've shared so far, \
I can suggest a qualitative, inspiring goal for this period. Would you like me to propose one, \
or do you already have an objective in mind that we should adjust together?";

pub const CREATE_KEY_RESULT: &str = "\n\n**STEP 3: Add a Key Result**\n\
Next, let's add a measurable key result to this objective. A good key result has a clear \
metric with a starting value and a target. Should I suggest one, or would you like to adjust \
the proposal before I create it?";

pub const CREATE_TASK: &str = "\n\n**STEP 4: Create a Task**\n\
Next, let's create a task that moves this key result forward. I can propose a concrete first \
action with an owner and a due date. Shall I go ahead, or would you like to change anything first?";

pub const WRAP_UP: &str = "\n\n**All set!**\n\
Next, let's review what we've built: your OKR session now has an objective, a key result and a \
first task. Would you like to add another key result or task, or is there anything to adjust?";
